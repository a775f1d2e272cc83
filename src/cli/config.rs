use std::{fs::File, path::Path};

use serde::{de::DeserializeOwned, Serialize};
use serde_yaml::Value;

/// Read a YAML file over `defaults`.
///
/// Fields missing from the file keep their default; nested sections are merged field by field.
pub fn load_yaml<C>(defaults: &C, path: &Path) -> anyhow::Result<C>
where
    C: Serialize + DeserializeOwned,
{
    let file = File::open(path)
        .map_err(|e| anyhow!("Unable to open config file {}: {}", path.display(), e))?;

    let overrides: Value = serde_yaml::from_reader(file)
        .map_err(|e| anyhow!("Unable to parse config file {}: {}", path.display(), e))?;

    let mut merged = serde_yaml::to_value(defaults)?;

    // An empty file parses as null
    if !overrides.is_null() {
        merge(&mut merged, overrides);
    }

    serde_yaml::from_value(merged)
        .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))
}

fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Mapping(base), Value::Mapping(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}
