//! Tolerant field extraction from `scontrol show job` text.
//!
//! Every known field has its own extraction rule (key plus value
//! character class), evaluated independently of all others. A rule that
//! does not match leaves its field absent; a value that matches but then
//! fails its typed conversion becomes [`FieldValue::Unparseable`] and is
//! logged at debug level. Neither case affects any other field.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex_lite::Regex;

/// Fields understood by the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    JobId,
    Account,
    UserId,
    JobName,
    JobState,
    Reason,
    RunTime,
    TimeLimit,
    SubmitTime,
    StartTime,
    EndTime,
    NodeList,
    NumNodes,
    NumCpus,
    Memory,
    Partition,
    Command,
    StdIn,
    StdOut,
    StdErr,
    WorkDir,
    ExitCode,
}

/// Character classes a value may be made of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueClass {
    /// Decimal digits only
    Digits,
    /// Identifier-like tokens: alphanumerics, dots, hyphens, underscores
    Word,
    /// Word plus path separators, node-list brackets and punctuation
    Path,
    /// Word plus colons, date separators and `T`; also admits tokens such
    /// as `Unknown` so that they surface as unparseable instead of absent
    Clock,
    /// Free text up to the next ` Key=` or the end of the line. scontrol
    /// keys start with an uppercase letter, so `mode=fast` stays in the value
    Text,
}

impl ValueClass {
    const fn pattern(self) -> &'static str {
        match self {
            ValueClass::Digits => r"([0-9]+)",
            ValueClass::Word => r"([A-Za-z0-9_.\-]+)",
            ValueClass::Path => r"([A-Za-z0-9_.\-/~+@%,:\[\]()]+)",
            ValueClass::Clock => r"([A-Za-z0-9_:/\-]+)",
            ValueClass::Text => r"(\S.*?)(?:\s+[A-Z][A-Za-z_:/]*=|\s*$)",
        }
    }
}

impl Field {
    /// All fields, in the order they are extracted
    pub const ALL: [Field; 22] = [
        Field::JobId,
        Field::Account,
        Field::UserId,
        Field::JobName,
        Field::JobState,
        Field::Reason,
        Field::RunTime,
        Field::TimeLimit,
        Field::SubmitTime,
        Field::StartTime,
        Field::EndTime,
        Field::NodeList,
        Field::NumNodes,
        Field::NumCpus,
        Field::Memory,
        Field::Partition,
        Field::Command,
        Field::StdIn,
        Field::StdOut,
        Field::StdErr,
        Field::WorkDir,
        Field::ExitCode,
    ];

    /// scontrol keys for this field, tried in order
    #[must_use]
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            Field::JobId => &["JobId"],
            Field::Account => &["Account"],
            Field::UserId => &["UserId"],
            Field::JobName => &["JobName"],
            Field::JobState => &["JobState"],
            Field::Reason => &["Reason"],
            Field::RunTime => &["RunTime"],
            Field::TimeLimit => &["TimeLimit"],
            Field::SubmitTime => &["SubmitTime"],
            Field::StartTime => &["StartTime"],
            Field::EndTime => &["EndTime"],
            Field::NodeList => &["NodeList"],
            Field::NumNodes => &["NumNodes"],
            Field::NumCpus => &["NumCPUs"],
            // `Mem=` only appears in the detailed (-dd) allocation lines
            Field::Memory => &["Mem", "MinMemoryNode", "MinMemoryCPU"],
            Field::Partition => &["Partition"],
            Field::Command => &["Command"],
            Field::StdIn => &["StdIn"],
            Field::StdOut => &["StdOut"],
            Field::StdErr => &["StdErr"],
            Field::WorkDir => &["WorkDir"],
            Field::ExitCode => &["ExitCode"],
        }
    }

    fn value_class(self) -> ValueClass {
        match self {
            Field::JobId | Field::NumCpus => ValueClass::Digits,
            Field::Account | Field::UserId | Field::JobState | Field::Partition => ValueClass::Word,
            Field::Reason | Field::NodeList | Field::Memory | Field::ExitCode | Field::NumNodes => {
                ValueClass::Path
            }
            Field::RunTime
            | Field::TimeLimit
            | Field::SubmitTime
            | Field::StartTime
            | Field::EndTime => ValueClass::Clock,
            Field::JobName
            | Field::Command
            | Field::StdIn
            | Field::StdOut
            | Field::StdErr
            | Field::WorkDir => ValueClass::Text,
        }
    }

    /// Human-readable name used in log messages
    #[must_use]
    pub fn label(self) -> &'static str {
        self.keys()[0]
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

struct ExtractionRule {
    field: Field,
    patterns: Vec<Regex>,
}

static RULES: LazyLock<Vec<ExtractionRule>> = LazyLock::new(|| {
    Field::ALL
        .iter()
        .map(|&field| ExtractionRule {
            field,
            patterns: field
                .keys()
                .iter()
                .map(|key| {
                    let pattern = format!(r"(?m)(?:^|\s){key}={}", field.value_class().pattern());
                    Regex::new(&pattern).expect("extraction patterns are static and valid")
                })
                .collect(),
        })
        .collect()
});

/// Slurm's explicit marker for an unset value
const NULL_MARKER: &str = "(null)";

/// Tri-state result of reading one field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldValue<T> {
    /// The key was not in the blob
    #[default]
    Absent,
    /// The key was present but the value failed typed conversion
    Unparseable(String),
    /// Converted value
    Value(T),
}

impl<T> FieldValue<T> {
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    #[must_use]
    pub fn is_unparseable(&self) -> bool {
        matches!(self, FieldValue::Unparseable(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldValue<U> {
        match self {
            FieldValue::Absent => FieldValue::Absent,
            FieldValue::Unparseable(raw) => FieldValue::Unparseable(raw),
            FieldValue::Value(v) => FieldValue::Value(f(v)),
        }
    }

    /// Render for humans: the formatted value, the raw text if it could not
    /// be converted, or `missing` when absent.
    pub fn display_with(&self, format: impl FnOnce(&T) -> String, missing: &str) -> String {
        match self {
            FieldValue::Value(v) => format(v),
            FieldValue::Unparseable(raw) => raw.clone(),
            FieldValue::Absent => missing.to_string(),
        }
    }
}

/// Raw values of the known fields found in one blob
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    values: BTreeMap<Field, String>,
}

impl FieldMap {
    /// Extract every known field from a job-description blob.
    ///
    /// Never fails: an empty or truncated blob simply yields fewer fields.
    #[must_use]
    pub fn extract(blob: &str) -> Self {
        let mut values = BTreeMap::new();

        for rule in RULES.iter() {
            let found = rule.patterns.iter().find_map(|re| {
                re.captures(blob)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().trim())
                    .filter(|v| !v.is_empty() && *v != NULL_MARKER)
            });

            if let Some(value) = found {
                values.insert(rule.field, value.to_string());
            }
        }

        Self { values }
    }

    /// The raw matched text of a field
    #[must_use]
    pub fn raw(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// A text field: present values need no conversion
    #[must_use]
    pub fn text(&self, field: Field) -> FieldValue<String> {
        match self.raw(field) {
            Some(v) => FieldValue::Value(v.to_string()),
            None => FieldValue::Absent,
        }
    }

    /// Convert a field with `convert`, isolating any failure to this field.
    pub fn parse_with<T, E>(
        &self,
        field: Field,
        convert: impl FnOnce(&str) -> Result<T, E>,
    ) -> FieldValue<T>
    where
        E: std::fmt::Display,
    {
        let Some(raw) = self.raw(field) else {
            return FieldValue::Absent;
        };

        match convert(raw) {
            Ok(v) => FieldValue::Value(v),
            Err(e) => {
                tracing::debug!(field = %field, raw_value = raw, error = %e, "Field value could not be converted");
                FieldValue::Unparseable(raw.to_string())
            }
        }
    }

    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A detailed `scontrol show jobid -dd` record for a running job
    pub(crate) const RUNNING_BLOB: &str = "\
JobId=4242 JobName=train model
   UserId=alice(1001) GroupId=alice(1001) MCS_label=N/A
   Priority=4294901759 Nice=0 Account=alice QOS=normal
   JobState=RUNNING Reason=None Dependency=(null)
   Requeue=1 Restarts=0 BatchFlag=1 Reboot=0 ExitCode=0:0
   DerivedExitCode=0:0
   RunTime=1-02:03:04 TimeLimit=2-00:00:00 TimeMin=N/A
   SubmitTime=2024-03-01T08:00:00 EligibleTime=2024-03-01T08:00:00
   AccrueTime=2024-03-01T08:00:01
   StartTime=2024-03-01T09:15:00 EndTime=2024-03-03T09:15:00 Deadline=N/A
   Partition=gpu AllocNode:Sid=login01:12345
   ReqNodeList=(null) ExcNodeList=(null)
   NodeList=gpu[01-02]
   BatchHost=gpu01
   NumNodes=2 NumCPUs=16 NumTasks=2 CPUs/Task=8 ReqB:S:C:T=0:0:*:*
   TRES=cpu=16,mem=64G,node=2,billing=16
   Socks/Node=* NtasksPerN:B:S:C=0:0:*:* CoreSpec=*
     Nodes=gpu[01-02] CPU_IDs=0-7 Mem=32768 GRES=gpu:1
   MinCPUsNode=8 MinMemoryNode=32G MinTmpDiskNode=0
   Command=/home/alice/jobs/train.sh
   WorkDir=/home/alice/jobs
   StdErr=/home/alice/jobs/slurm-4242.err
   StdIn=/dev/null
   StdOut=/home/alice/jobs/slurm-4242.out
";

    #[test]
    fn test_extract_all_fields_from_detailed_blob() {
        let map = FieldMap::extract(RUNNING_BLOB);
        assert_eq!(map.raw(Field::JobId), Some("4242"));
        assert_eq!(map.raw(Field::JobName), Some("train model"));
        assert_eq!(map.raw(Field::UserId), Some("alice"));
        assert_eq!(map.raw(Field::Account), Some("alice"));
        assert_eq!(map.raw(Field::JobState), Some("RUNNING"));
        assert_eq!(map.raw(Field::Reason), Some("None"));
        assert_eq!(map.raw(Field::RunTime), Some("1-02:03:04"));
        assert_eq!(map.raw(Field::TimeLimit), Some("2-00:00:00"));
        assert_eq!(map.raw(Field::StartTime), Some("2024-03-01T09:15:00"));
        assert_eq!(map.raw(Field::EndTime), Some("2024-03-03T09:15:00"));
        assert_eq!(map.raw(Field::NodeList), Some("gpu[01-02]"));
        assert_eq!(map.raw(Field::NumNodes), Some("2"));
        assert_eq!(map.raw(Field::NumCpus), Some("16"));
        assert_eq!(map.raw(Field::Memory), Some("32768"));
        assert_eq!(map.raw(Field::Partition), Some("gpu"));
        assert_eq!(map.raw(Field::Command), Some("/home/alice/jobs/train.sh"));
        assert_eq!(map.raw(Field::WorkDir), Some("/home/alice/jobs"));
        assert_eq!(map.raw(Field::StdErr), Some("/home/alice/jobs/slurm-4242.err"));
        assert_eq!(map.raw(Field::StdIn), Some("/dev/null"));
        assert_eq!(map.raw(Field::StdOut), Some("/home/alice/jobs/slurm-4242.out"));
        assert_eq!(map.raw(Field::ExitCode), Some("0:0"));
        assert_eq!(map.len(), Field::ALL.len());
    }

    #[test]
    fn test_keys_do_not_match_inside_longer_keys() {
        // ArrayJobId / DerivedExitCode / ReqNodeList must not be mistaken
        // for JobId / ExitCode / NodeList
        let blob = "ArrayJobId=99 DerivedExitCode=1:0 ReqNodeList=n01";
        let map = FieldMap::extract(blob);
        assert!(!map.contains(Field::JobId));
        assert!(!map.contains(Field::ExitCode));
        assert!(!map.contains(Field::NodeList));
    }

    #[test]
    fn test_text_values_keep_lowercase_assignments() {
        let blob = "JobId=3 JobName=sweep lr=0.1 UserId=bob(1002)\n   Command=./run.sh mode=fast\n   WorkDir=/scratch/bob Partition=cpu";
        let map = FieldMap::extract(blob);
        assert_eq!(map.raw(Field::JobName), Some("sweep lr=0.1"));
        assert_eq!(map.raw(Field::UserId), Some("bob"));
        assert_eq!(map.raw(Field::Command), Some("./run.sh mode=fast"));
        // An uppercase key still ends the value
        assert_eq!(map.raw(Field::WorkDir), Some("/scratch/bob"));
        assert_eq!(map.raw(Field::Partition), Some("cpu"));
    }

    #[test]
    fn test_missing_field_leaves_others_unaffected() {
        let full = FieldMap::extract(RUNNING_BLOB);

        for field in Field::ALL {
            let stripped: String = RUNNING_BLOB
                .lines()
                .map(|line| {
                    line.split(' ')
                        .filter(|tok| !field.keys().iter().any(|k| tok.starts_with(&format!("{k}="))))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\n");

            let map = FieldMap::extract(&stripped);
            assert!(!map.contains(field), "{field} should be absent");

            for other in Field::ALL.iter().filter(|f| **f != field) {
                assert_eq!(
                    map.raw(*other),
                    full.raw(*other),
                    "{other} changed when {field} was removed"
                );
            }
        }
    }

    #[test]
    fn test_empty_and_truncated_blobs() {
        assert!(FieldMap::extract("").is_empty());

        let truncated = "JobId=7 JobName=abc\n   UserId=bob(1) Gro";
        let map = FieldMap::extract(truncated);
        assert_eq!(map.raw(Field::JobId), Some("7"));
        assert_eq!(map.raw(Field::JobName), Some("abc"));
        assert_eq!(map.raw(Field::UserId), Some("bob"));
        assert!(!map.contains(Field::JobState));
    }

    #[test]
    fn test_null_marker_is_absent() {
        let map = FieldMap::extract("JobId=1 NodeList=(null) StdIn=(null)");
        assert!(!map.contains(Field::NodeList));
        assert!(!map.contains(Field::StdIn));
    }

    #[test]
    fn test_parse_with_tristate() {
        let map = FieldMap::extract("JobId=1 StartTime=Unknown NumCPUs=4");

        let start = map.parse_with(Field::StartTime, crate::models::time::parse_timestamp);
        assert_eq!(start, FieldValue::Unparseable("Unknown".to_string()));

        let end = map.parse_with(Field::EndTime, crate::models::time::parse_timestamp);
        assert!(end.is_absent());

        let cpus = map.parse_with(Field::NumCpus, str::parse::<u32>);
        assert_eq!(cpus, FieldValue::Value(4));
    }

    #[test]
    fn test_field_value_display_with() {
        let v: FieldValue<u32> = FieldValue::Value(3);
        assert_eq!(v.display_with(|n| format!("{n} cpus"), "unknown"), "3 cpus");
        let u: FieldValue<u32> = FieldValue::Unparseable("lots".into());
        assert_eq!(u.display_with(|n| n.to_string(), "unknown"), "lots");
        let a: FieldValue<u32> = FieldValue::Absent;
        assert_eq!(a.display_with(|n| n.to_string(), "unknown"), "unknown");
    }

    #[test]
    fn test_memory_falls_back_to_min_memory_node() {
        let map = FieldMap::extract("JobId=1 MinMemoryNode=4G MinTmpDiskNode=0");
        assert_eq!(map.raw(Field::Memory), Some("4G"));
    }
}
