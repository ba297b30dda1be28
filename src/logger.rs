use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

use crate::error::Error;
use crate::types::{DeviceState, Tank};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleLogMode {
    Full,
    Diffed,
}

/// NDJSON log of normalized output per refresh cycle, plus accepted and
/// rejected writes. Diffed mode records only the paths that changed since
/// the previous cycle for the same device.
pub(crate) struct CycleLogger {
    mode: CycleLogMode,
    file: File,
    previous: HashMap<String, Value>,
}

impl CycleLogger {
    pub fn new(mode: CycleLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous: HashMap::new(),
        })
    }

    pub fn log_cycle(&mut self, device_id: &str, state: &DeviceState) {
        let record = match serde_json::to_value(state) {
            Ok(v) => v,
            Err(e) => {
                warn!("failed to serialize device state for log: {e}");
                return;
            }
        };

        match self.mode {
            CycleLogMode::Full => {
                let entry = json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "cycle",
                    "device": device_id,
                    "state": record,
                });
                self.write_line(&entry);
            }
            CycleLogMode::Diffed => {
                let entry = match self.previous.get(device_id) {
                    None => json!({
                        "ts": Utc::now().to_rfc3339(),
                        "dir": "cycle",
                        "device": device_id,
                        "full": true,
                        "state": record,
                    }),
                    Some(prev) => {
                        let mut changes = Vec::new();
                        diff_records(prev, &record, "", &mut changes);
                        let change_entries: Vec<Value> = changes
                            .iter()
                            .map(|(path, old, new)| json!({ "path": path, "old": old, "new": new }))
                            .collect();
                        json!({
                            "ts": Utc::now().to_rfc3339(),
                            "dir": "cycle",
                            "device": device_id,
                            "changes": change_entries,
                        })
                    }
                };
                self.write_line(&entry);
                self.previous.insert(device_id.to_string(), record);
            }
        }
    }

    pub fn log_write(&mut self, action: &str, tank: Tank, fields: &[(&'static str, f64)]) {
        let mut field_map = serde_json::Map::new();
        for (key, value) in fields {
            field_map.insert((*key).to_string(), json!(value));
        }
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "write",
            "action": action,
            "tank": tank.as_str(),
            "fields": field_map,
        });
        self.write_line(&entry);
    }

    pub fn log_reject(&mut self, action: &str, tank: Option<Tank>, error: &Error) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "reject",
            "action": action,
            "tank": tank.map(|t| t.as_str()),
            "reason": error.to_string(),
        });
        self.write_line(&entry);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write cycle log entry: {e}");
        }
    }
}

/// Record leaf-level differences between two output records. Added keys
/// show a null old value, removed keys a null new value.
pub(crate) fn diff_records(
    previous: &Value,
    current: &Value,
    path_prefix: &str,
    changes: &mut Vec<(String, Value, Value)>,
) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = if path_prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{path_prefix}.{key}")
                };
                match prev_map.get(key) {
                    Some(prev_val) => diff_records(prev_val, curr_val, &path, changes),
                    None => changes.push((path, Value::Null, curr_val.clone())),
                }
            }
            for (key, prev_val) in prev_map {
                if !curr_map.contains_key(key) {
                    let path = if path_prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{path_prefix}.{key}")
                    };
                    changes.push((path, prev_val.clone(), Value::Null));
                }
            }
        }
        (prev, curr) if prev != curr => {
            changes.push((path_prefix.to_string(), prev.clone(), curr.clone()));
        }
        _ => {}
    }
}
