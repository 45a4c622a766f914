use crate::{
    class::Class,
    error::Error,
    instance::{Instance, Kwargs, setattr},
    resolver,
    value::Value,
};

/// Slow-path construction: class-level starting values first, then each
/// keyword argument through setattr. `None` arguments keep the default.
pub(crate) fn initialize(class: &Class, kwargs: Kwargs) -> Result<Instance, Error> {
    let descriptor = resolver::descriptor(class)?;
    let slots = resolver::class_kwargs(class)?;
    let mut instance = Instance::from_parts(class.clone(), descriptor, slots);

    for (name, value) in kwargs {
        if !instance.descriptor().has_attribute(&name) {
            return Err(unknown_kwarg(class, &name, &value));
        }
        if value.is_none() {
            continue;
        }
        setattr::assign(&mut instance, &name, value)?;
    }

    Ok(instance)
}

pub(crate) fn unknown_kwarg(class: &Class, name: &str, value: &Value) -> Error {
    let class = class.name();

    Error::unknown_attribute(
        class,
        name,
        format!(
            "{class} has no attribute '{name}' and cannot be assigned the value '{value}'. \
             Use {class}.__default_kwargs__() see what attributes are available"
        ),
    )
}
