use crate::{
    config,
    error::{Error, Site},
    instance::{Instance, init::unknown_kwarg},
    validate::{self, Context},
    value::Value,
};

/// The single write path for instance attributes.
///
/// Class variables are untyped and stored as given. Declared fields run
/// the validator unless `skip_validation` is in scope. `None` may only
/// land on a field that admits it or is still unset.
pub(crate) fn assign(instance: &mut Instance, name: &str, value: Value) -> Result<(), Error> {
    let descriptor = instance.descriptor.clone();
    if !descriptor.has_attribute(name) {
        return Err(unknown_kwarg(&instance.class, name, &value));
    }

    let annotation = match descriptor.annotation(name) {
        Some(annotation) if !config::current().skip_validation => annotation,
        _ => {
            instance.store(name, value);
            return Ok(());
        }
    };

    if value.is_none() && !annotation.admits_none() {
        let already_set = instance.slot(name).is_some_and(|v| !v.is_none());
        if already_set {
            return Err(Error::type_mismatch_with(
                &Site::field(name),
                annotation,
                "NoneType",
                format!(
                    "Can't set None, to a variable that is already set. Invalid type for attribute \
                     '{name}'. Expected '{annotation}' but got '<class 'NoneType'>'"
                ),
            ));
        }
        instance.store(name, value);
        return Ok(());
    }

    let class = instance.class.clone();
    let ctx = Context::new(Some(&class), Site::field(name));
    let value = validate::check_or_coerce(annotation, value, &ctx)?;
    instance.store(name, value);

    Ok(())
}
