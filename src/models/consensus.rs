use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One function the consensus call agreed is responsible for the flaw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootCauseFunction {
    #[serde(default, deserialize_with = "lenient_string")]
    pub function_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub filename: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub package: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: String,
    #[serde(
        default,
        rename = "Qualified Name",
        alias = "qualified_name",
        alias = "qualifiedName",
        deserialize_with = "lenient_string"
    )]
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "lenient_strings")]
    pub canonical_name: Vec<String>,
}

impl RootCauseFunction {
    /// Names this function contributes to a commit's method list. Explicit
    /// canonical names win, then the qualified name, then the bare name.
    pub fn method_names(&self) -> Vec<String> {
        if !self.canonical_name.is_empty() {
            return self.canonical_name.clone();
        }
        let name = if self.qualified_name.trim().is_empty() {
            self.function_name.trim()
        } else {
            self.qualified_name.trim()
        };
        if name.is_empty() {
            Vec::new()
        } else {
            vec![name.to_string()]
        }
    }
}

/// Parsed consensus reply for one diff unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsensusReply {
    #[serde(default)]
    pub root_cause_functions: Vec<RootCauseFunction>,
}

/// An accepted consensus for one file of one commit, with its provenance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsensusRecord {
    pub commit_url: String,
    pub source: String,
    pub reference_url: String,
    pub filename: String,
    pub root_cause_functions: Vec<RootCauseFunction>,
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_to_string(Value::deserialize(deserializer)?))
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .into_iter()
            .map(scalar_to_string)
            .filter(|s| !s.is_empty())
            .collect(),
        other => {
            let s = scalar_to_string(other);
            if s.is_empty() { Vec::new() } else { vec![s] }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_entry() {
        let reply: ConsensusReply = serde_json::from_str(
            r#"{"root_cause_functions":[{"function_name":"parseInput","role":"sink"}]}"#,
        )
        .unwrap();
        assert_eq!(reply.root_cause_functions.len(), 1);
        let f = &reply.root_cause_functions[0];
        assert_eq!(f.function_name, "parseInput");
        assert_eq!(f.role, "sink");
        assert_eq!(f.method_names(), vec!["parseInput".to_string()]);
    }

    #[test]
    fn test_qualified_name_aliases_and_nulls() {
        let f: RootCauseFunction = serde_json::from_str(
            r#"{"function_name":"run","Qualified Name":"org.acme.Parser.run","version":null,"package":1}"#,
        )
        .unwrap();
        assert_eq!(f.qualified_name, "org.acme.Parser.run");
        assert_eq!(f.version, "");
        assert_eq!(f.package, "1");
        assert_eq!(f.method_names(), vec!["org.acme.Parser.run".to_string()]);

        let g: RootCauseFunction =
            serde_json::from_str(r#"{"function_name":"run","qualified_name":"a.b.run"}"#).unwrap();
        assert_eq!(g.qualified_name, "a.b.run");
    }

    #[test]
    fn test_canonical_names_take_precedence() {
        let f: RootCauseFunction = serde_json::from_str(
            r#"{"function_name":"run","canonical_name":["pkg.A.run","pkg.B.run"]}"#,
        )
        .unwrap();
        assert_eq!(f.method_names(), vec!["pkg.A.run".to_string(), "pkg.B.run".to_string()]);
    }

    #[test]
    fn test_serialize_uses_qualified_name_key() {
        let f = RootCauseFunction { function_name: "f".into(), qualified_name: "m.f".into(), ..Default::default() };
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v["Qualified Name"], "m.f");
        assert!(v.get("canonical_name").is_none());
    }

    #[test]
    fn test_nameless_entry_contributes_nothing() {
        let f = RootCauseFunction { role: "sink".into(), ..Default::default() };
        assert!(f.method_names().is_empty());
    }
}
