use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbInstanceOption {
    pub instance: String,
    pub class: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbVersionOption {
    pub version: String,
    pub family: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instances: Vec<DbInstanceOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbEngineOption {
    pub engine: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub versions: Vec<DbVersionOption>,
}

/// Database engines, versions and instance classes offered to the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DbCatalog {
    pub engines: Vec<DbEngineOption>,
}

impl DbCatalog {
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn version(&self, engine: &str, version: &str) -> Option<&DbVersionOption> {
        self.engines
            .iter()
            .find(|option| option.engine == engine)?
            .versions
            .iter()
            .find(|option| option.version == version)
    }

    pub fn family_of(&self, engine: &str, version: &str) -> Option<&str> {
        self.version(engine, version)
            .map(|option| option.family.as_str())
    }

    /// Instance classes available for a version. Empty when the version is unknown.
    pub fn instances(&self, engine: &str, version: &str) -> impl Iterator<Item = &DbInstanceOption> {
        self.version(engine, version)
            .into_iter()
            .flat_map(|option| option.instances.iter())
    }

    pub fn offers_instance(&self, engine: &str, version: &str, instance: &str) -> bool {
        self.instances(engine, version)
            .any(|option| option.instance == instance)
    }
}

#[cfg(test)]
pub(crate) fn sample_catalog() -> DbCatalog {
    DbCatalog {
        engines: vec![DbEngineOption {
            engine: "postgres".to_string(),
            description: "PostgreSQL".to_string(),
            versions: vec![
                DbVersionOption {
                    version: "14.7".to_string(),
                    family: "postgres14".to_string(),
                    description: "PostgreSQL 14.7".to_string(),
                    instances: vec![
                        DbInstanceOption {
                            instance: "T3_MICRO".to_string(),
                            class: "db.t3.micro".to_string(),
                            description: "2 vCPUs 1 GiB RAM".to_string(),
                        },
                        DbInstanceOption {
                            instance: "M5_LARGE".to_string(),
                            class: "db.m5.large".to_string(),
                            description: "2 vCPUs 8 GiB RAM".to_string(),
                        },
                    ],
                },
                DbVersionOption {
                    version: "15.2".to_string(),
                    family: "postgres15".to_string(),
                    description: "PostgreSQL 15.2".to_string(),
                    instances: vec![DbInstanceOption {
                        instance: "M5_LARGE".to_string(),
                        class: "db.m5.large".to_string(),
                        description: "2 vCPUs 8 GiB RAM".to_string(),
                    }],
                },
            ],
        }],
    }
}
