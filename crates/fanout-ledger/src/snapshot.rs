//! Holder snapshots.
//!
//! Both providers return holders ranked by weight descending with
//! zero-weight entries removed, truncated to the requested limit.
//!
//! [`FileSnapshot`] re-reads its file on every call, so a recurring job
//! sees holder changes between runs. The file layout is one array of
//! tables per asset:
//!
//! ```toml
//! [[assets."So11111111111111111111111111111111111111112"]]
//! owner = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"
//! weight = 1500000.0
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fanout_engine::{GatewayError, HolderSnapshot};
use fanout_types::{AssetId, Holder};
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Default, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    assets: HashMap<String, Vec<Holder>>,
}

/// Order holders for distribution: positive finite weights only, heaviest
/// first, at most `limit` entries.
pub fn rank(mut holders: Vec<Holder>, limit: Option<usize>) -> Vec<Holder> {
    holders.retain(|h| h.weight.is_finite() && h.weight > 0.0);
    holders.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    if let Some(limit) = limit {
        holders.truncate(limit);
    }
    holders
}

/// In-memory snapshot.
#[derive(Clone, Debug, Default)]
pub struct StaticSnapshot {
    assets: HashMap<AssetId, Vec<Holder>>,
}

impl StaticSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_asset(mut self, asset: AssetId, holders: Vec<Holder>) -> Self {
        self.insert(asset, holders);
        self
    }

    /// Replace the holder list of `asset`.
    pub fn insert(&mut self, asset: AssetId, holders: Vec<Holder>) {
        self.assets.insert(asset, holders);
    }

    /// Load every asset in a snapshot file once.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let file: SnapshotFile = toml::from_str(&contents)?;
        let mut snapshot = Self::new();
        for (asset, holders) in file.assets {
            snapshot.insert(AssetId::from(asset), holders);
        }
        Ok(snapshot)
    }

    fn lookup(
        &self,
        asset: &AssetId,
        limit: Option<usize>,
    ) -> std::result::Result<Vec<Holder>, GatewayError> {
        self.assets
            .get(asset)
            .map(|holders| rank(holders.clone(), limit))
            .ok_or_else(|| GatewayError::UnknownAsset(asset.to_string()))
    }
}

impl HolderSnapshot for StaticSnapshot {
    async fn holders(
        &self,
        asset: &AssetId,
        limit: Option<usize>,
    ) -> std::result::Result<Vec<Holder>, GatewayError> {
        self.lookup(asset, limit)
    }
}

/// Snapshot backed by a TOML file, read on every query.
#[derive(Clone, Debug)]
pub struct FileSnapshot {
    path: PathBuf,
}

impl FileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HolderSnapshot for FileSnapshot {
    async fn holders(
        &self,
        asset: &AssetId,
        limit: Option<usize>,
    ) -> std::result::Result<Vec<Holder>, GatewayError> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            GatewayError::Unavailable(format!("reading {}: {e}", self.path.display()))
        })?;
        let mut file: SnapshotFile = toml::from_str(&contents).map_err(|e| {
            GatewayError::Unavailable(format!("parsing {}: {e}", self.path.display()))
        })?;

        let holders = file
            .assets
            .remove(asset.as_str())
            .ok_or_else(|| GatewayError::UnknownAsset(asset.to_string()))?;

        let ranked = rank(holders, limit);
        tracing::debug!(%asset, holders = ranked.len(), "snapshot loaded");
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use fanout_types::Address;

    use super::*;

    fn holder(name: &str, weight: f64) -> Holder {
        Holder::new(Address::from(name.to_string()), weight)
    }

    fn asset() -> AssetId {
        AssetId::new("mint").expect("asset")
    }

    fn write_snapshot(tag: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fanout-snapshot-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("holders.toml");
        std::fs::write(&path, contents).expect("write");
        path
    }

    #[test]
    fn test_rank_sorts_filters_truncates() {
        let ranked = rank(
            vec![
                holder("a", 5.0),
                holder("b", 0.0),
                holder("c", 50.0),
                holder("d", 10.0),
                holder("e", f64::NAN),
            ],
            Some(2),
        );
        let owners: Vec<&str> = ranked.iter().map(|h| h.owner.as_str()).collect();
        assert_eq!(owners, vec!["c", "d"]);
    }

    #[test]
    fn test_rank_without_limit() {
        let ranked = rank(vec![holder("a", 1.0), holder("b", 2.0)], None);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].owner.as_str(), "b");
    }

    #[tokio::test]
    async fn test_static_snapshot() {
        let snapshot = StaticSnapshot::new()
            .with_asset(asset(), vec![holder("a", 1.0), holder("b", 3.0)]);
        let holders = snapshot.holders(&asset(), None).await.expect("holders");
        assert_eq!(holders[0].owner.as_str(), "b");

        let unknown = AssetId::new("other").expect("asset");
        assert!(matches!(
            snapshot.holders(&unknown, None).await,
            Err(GatewayError::UnknownAsset(_))
        ));
    }

    #[tokio::test]
    async fn test_file_snapshot() {
        let path = write_snapshot(
            "file",
            r#"
[[assets.mint]]
owner = "small"
weight = 1.0

[[assets.mint]]
owner = "big"
weight = 9.0

[[assets.mint]]
owner = "gone"
weight = 0.0
"#,
        );
        let snapshot = FileSnapshot::new(&path);
        let holders = snapshot.holders(&asset(), None).await.expect("holders");
        let owners: Vec<&str> = holders.iter().map(|h| h.owner.as_str()).collect();
        assert_eq!(owners, vec!["big", "small"]);

        let top = snapshot.holders(&asset(), Some(1)).await.expect("holders");
        assert_eq!(top.len(), 1);

        let loaded = StaticSnapshot::load(&path).expect("load");
        assert_eq!(loaded.holders(&asset(), None).await.expect("holders").len(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let snapshot = FileSnapshot::new("/nonexistent/fanout/holders.toml");
        assert!(matches!(
            snapshot.holders(&asset(), None).await,
            Err(GatewayError::Unavailable(_))
        ));
    }
}
