use std::collections::HashMap;
use std::rc::Rc;

use super::{BEFORE_SET, Feature, HookEvent, HookRegistry, HookScope};
use crate::core::{Result, Value};

/// Transforms a property value before it is stored.
pub type Filter = Rc<dyn Fn(Value) -> Result<Value>>;

/// Runs per-property filter chains on every assignment.
///
/// ```
/// use memorecord::hooks::{PropertyFilter, filter};
///
/// let filters = PropertyFilter::new()
///     .filter("quantity", filter::integer())
///     .chain("label", [filter::trimmed(), filter::lowercase()]);
/// assert_eq!(filters.filtered_properties(), vec!["label", "quantity"]);
/// ```
#[derive(Clone, Default)]
pub struct PropertyFilter {
    filters: HashMap<String, Vec<Filter>>,
}

impl PropertyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one filter to the chain of `property`.
    pub fn filter(mut self, property: &str, filter: Filter) -> Self {
        self.filters
            .entry(property.to_string())
            .or_default()
            .push(filter);
        self
    }

    /// Append several filters, run in the given order.
    pub fn chain(mut self, property: &str, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters
            .entry(property.to_string())
            .or_default()
            .extend(filters);
        self
    }

    pub fn filtered_properties(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the chain for `property`; properties without filters pass through.
    pub fn apply(&self, property: &str, value: Value) -> Result<Value> {
        let Some(chain) = self.filters.get(property) else {
            return Ok(value);
        };
        chain.iter().try_fold(value, |value, filter| filter(value))
    }
}

impl Feature for PropertyFilter {
    fn name(&self) -> &str {
        "property_filter"
    }

    fn install(&self, hooks: &mut HookRegistry) {
        let filters = self.clone();
        hooks.listen(
            BEFORE_SET,
            Rc::new(move |_scope: &HookScope<'_>, event: &mut HookEvent<'_>| {
                if let HookEvent::BeforeSet { property, value } = event {
                    let current = std::mem::take(&mut **value);
                    **value = filters.apply(*property, current)?;
                }
                Ok(None)
            }),
        );
    }
}

/// Integer conversion: numeric text is parsed, floats truncate, anything
/// unparseable becomes 0.
pub fn integer() -> Filter {
    Rc::new(|value: Value| {
        Ok(Value::Integer(match &value {
            Value::Integer(i) => *i,
            Value::Float(f) => f.trunc() as i64,
            Value::Boolean(b) => i64::from(*b),
            Value::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
                    .unwrap_or(0)
            }
            Value::Null => 0,
        }))
    })
}

/// Float conversion with the same leniency as `integer`.
pub fn float() -> Filter {
    Rc::new(|value: Value| {
        Ok(Value::Float(match &value {
            Value::Integer(i) => *i as f64,
            Value::Float(f) => *f,
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Value::Null => 0.0,
        }))
    })
}

/// Round floats to `digits` decimal places; other values pass through.
pub fn rounded(digits: u32) -> Filter {
    Rc::new(move |value: Value| {
        Ok(match value {
            Value::Float(f) => {
                let factor = 10f64.powi(digits as i32);
                Value::Float((f * factor).round() / factor)
            }
            other => other,
        })
    })
}

pub fn trimmed() -> Filter {
    Rc::new(|value: Value| {
        Ok(match value {
            Value::Text(s) => Value::Text(s.trim().to_string()),
            other => other,
        })
    })
}

pub fn lowercase() -> Filter {
    Rc::new(|value: Value| {
        Ok(match value {
            Value::Text(s) => Value::Text(s.to_lowercase()),
            other => other,
        })
    })
}

/// Replace any value with `constant`.
pub fn constant(constant: impl Into<Value>) -> Filter {
    let constant = constant.into();
    Rc::new(move |_: Value| Ok(constant.clone()))
}
