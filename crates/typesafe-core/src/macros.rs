// kwargs
/// Build a `Kwargs` list from `"field" => value` pairs; values go through `Value::from`.
#[macro_export]
macro_rules! kwargs {
    () => {
        $crate::instance::Kwargs::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut kwargs = $crate::instance::Kwargs::new();
        $(
            kwargs.insert($key, $crate::value::Value::from($value));
        )+
        kwargs
    }};
}
