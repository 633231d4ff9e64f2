//! Task files consumed by `converge apply`
//!
//! A file holds either one task or a `tasks:` list:
//!
//! ```yaml
//! tasks:
//!   - name: Create cache
//!     module: na_ontap_flexcache
//!     args:
//!       name: cache1
//!       vserver: vs1
//!       origin_volume: vol1
//! ```

use serde::Deserialize;

use crate::modules::{ModuleArgs, SpecialParameters};
use crate::state::ConfigurationObject;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub name: Option<String>,
    pub module: String,
    #[serde(default)]
    pub args: ConfigurationObject,
    #[serde(default)]
    pub check_mode: bool,
    #[serde(default)]
    pub diff: bool,
}

impl Task {
    pub fn module_args(&self) -> ModuleArgs {
        ModuleArgs {
            args: self.args.clone(),
            special: SpecialParameters {
                check_mode: self.check_mode,
                diff: self.diff,
            },
        }
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.module)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskFile {
    Many { tasks: Vec<Task> },
    One(Task),
}

/// Parses YAML (and therefore JSON) task content.
pub fn parse_tasks(content: &str) -> Result<Vec<Task>, serde_yaml::Error> {
    Ok(match serde_yaml::from_str(content)? {
        TaskFile::Many { tasks } => tasks,
        TaskFile::One(task) => vec![task],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_task() {
        let tasks = parse_tasks(
            "module: fortios_firewall_address\nargs:\n  name: web01\n  subnet: 10.0.0.1/32\ndiff: true\n",
        )
        .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].label(), "fortios_firewall_address");
        let args = tasks[0].module_args();
        assert!(args.special.diff);
        assert_eq!(args.args["name"], "web01");
    }

    #[test]
    fn test_task_list_and_json() {
        let tasks = parse_tasks(
            r#"{"tasks": [
                {"name": "remove cache", "module": "na_ontap_flexcache",
                 "args": {"state": "absent", "name": "cache1", "vserver": "vs1", "force_unmount": true}},
                {"module": "na_ontap_volume", "args": {"state": "absent", "name": "vol1", "vserver": "vs1"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].label(), "remove cache");
        assert_eq!(tasks[1].module, "na_ontap_volume");
    }

    #[test]
    fn test_missing_module_is_an_error() {
        assert!(parse_tasks("args:\n  name: web01\n").is_err());
    }
}
