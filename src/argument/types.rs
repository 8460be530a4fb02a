//! Commonly used argument types.
use std::any::Any;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use phf::phf_set;

use super::{value, ArgumentType, TransformError, Value};
use crate::input::Input;

static TRUE_WORDS: phf::Set<&'static str> = phf_set! {
    "true", "yes", "on", "1",
};

static FALSE_WORDS: phf::Set<&'static str> = phf_set! {
    "false", "no", "off", "0",
};

fn is_single(input: &Input) -> bool {
    input.as_single().is_some()
}

/// Any single word.
pub fn string() -> ArgumentType {
    ArgumentType::new("string", is_single, |input: &Input| {
        input
            .as_single()
            .map(str::to_owned)
            .ok_or_else(|| TransformError::new(input, "string", "not a single word"))
    })
}

fn looks_like_integer(word: &str) -> bool {
    let digits = word.strip_prefix(&['+', '-'][..]).unwrap_or(word);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// A decimal integer. Values out of the range of `T` pass validation and
/// fail in the transformer.
pub fn integer<T>() -> ArgumentType
where
    T: FromStr + Any + Send + Sync + Clone,
    T::Err: Display,
{
    let name = std::any::type_name::<T>();
    ArgumentType::new(
        name,
        |input: &Input| input.as_single().map_or(false, looks_like_integer),
        move |input: &Input| {
            let word = input
                .as_single()
                .ok_or_else(|| TransformError::new(input, name, "not a single word"))?;
            word.parse::<T>()
                .map_err(|err| TransformError::new(input, name, err))
        },
    )
}

pub fn float() -> ArgumentType {
    ArgumentType::new(
        "float",
        |input: &Input| input.as_single().map_or(false, |w| w.parse::<f64>().is_ok()),
        |input: &Input| {
            let word = input
                .as_single()
                .ok_or_else(|| TransformError::new(input, "float", "not a single word"))?;
            word.parse::<f64>()
                .map_err(|err| TransformError::new(input, "float", err))
        },
    )
}

/// `true`/`yes`/`on`/`1` or `false`/`no`/`off`/`0`, case-insensitive.
/// Defaults to `false` and can be used as a flag (`--verbose`, `-v`).
pub fn boolean() -> ArgumentType {
    ArgumentType::new(
        "boolean",
        |input: &Input| {
            input.as_single().map_or(false, |w| {
                let w = w.to_ascii_lowercase();
                TRUE_WORDS.contains(w.as_str()) || FALSE_WORDS.contains(w.as_str())
            })
        },
        |input: &Input| {
            let word = input.as_single().map(str::to_ascii_lowercase);
            match word.as_deref() {
                Some(w) if TRUE_WORDS.contains(w) => Ok(true),
                Some(w) if FALSE_WORDS.contains(w) => Ok(false),
                _ => Err(TransformError::new(input, "boolean", "not a boolean")),
            }
        },
    )
    .with_default(false)
    .with_possibilities(|| vec![Input::single("true"), Input::single("false")])
    .flag()
}

/// One of the given words, resolved as a `String`.
pub fn one_of(choices: &[&str]) -> ArgumentType {
    let choices: Arc<Vec<String>> = Arc::new(choices.iter().map(|s| (*s).to_owned()).collect());
    let name = format!("one of {}", choices.join("|"));
    let accepted = choices.clone();
    let listed = choices;
    ArgumentType::new(
        &name,
        move |input: &Input| {
            input
                .as_single()
                .map_or(false, |w| accepted.iter().any(|c| c == w))
        },
        |input: &Input| {
            input
                .as_single()
                .map(str::to_owned)
                .ok_or_else(|| TransformError::new(input, "choice", "not a single word"))
        },
    )
    .with_possibilities(move || listed.iter().map(|c| Input::single(c.as_str())).collect())
}

/// A list input whose elements are all of `element`. Resolves to the
/// `Vec<T>` of the element type. A multiple argument of this type resolves
/// to a `Vec<Value>` of those vectors.
pub fn list_of(element: ArgumentType) -> ArgumentType {
    let validator = element.clone();
    let transformer = element.clone();
    ArgumentType {
        name: format!("list of {}", element.name()),
        boolean: false,
        default: None,
        validator: Arc::new(move |input: &Input| {
            input
                .as_list()
                .map_or(false, |items| items.iter().all(|item| validator.validate(item)))
        }),
        transformer: Arc::new(move |input: &Input| -> Result<Value, TransformError> {
            let items = input
                .as_list()
                .ok_or_else(|| TransformError::new(input, "list", "not a list"))?;
            let values = items
                .iter()
                .map(|item| transformer.transform(item))
                .collect::<Result<Vec<Value>, TransformError>>()?;
            Ok(transformer.collect(values))
        }),
        collector: Arc::new(|values: Vec<Value>| value(values)),
        possibilities: Arc::new(Vec::<Input>::new),
    }
}

/// A map input. Resolves to a `Vec<(K, V)>` in written order.
pub fn map_of<K, V>(key: ArgumentType, val: ArgumentType) -> ArgumentType
where
    K: Any + Send + Sync + Clone,
    V: Any + Send + Sync + Clone,
{
    let name = format!("map of {} to {}", key.name(), val.name());
    let (key_validator, val_validator) = (key.clone(), val.clone());
    let expected = name.clone();
    ArgumentType::new(
        &name,
        move |input: &Input| {
            input.as_map().map_or(false, |entries| {
                entries
                    .iter()
                    .all(|(k, v)| key_validator.validate(k) && val_validator.validate(v))
            })
        },
        move |input: &Input| {
            let entries = input
                .as_map()
                .ok_or_else(|| TransformError::new(input, &expected, "not a map"))?;
            let mut pairs: Vec<(K, V)> = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let k = key.transform(k)?;
                let v = val.transform(v)?;
                match (k.downcast_ref::<K>(), v.downcast_ref::<V>()) {
                    (Some(k), Some(v)) => pairs.push((k.clone(), v.clone())),
                    _ => return Err(TransformError::new(input, &expected, "mismatched entry type")),
                }
            }
            Ok(pairs)
        },
    )
}
