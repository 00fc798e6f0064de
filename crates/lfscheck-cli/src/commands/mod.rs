use std::sync::Arc;

use anyhow::Context;
use lfscheck_config::LfsCheckConfig;
use lfscheck_store::CloudStore;

pub mod check_lfs;
pub mod dispatch;
pub mod oid_mapper;
pub mod remediate_lfs;

/// Source and target clients. Nothing is contacted until the first call.
fn open_stores(config: &LfsCheckConfig) -> anyhow::Result<(Arc<CloudStore>, Arc<CloudStore>)> {
    let timeout = config.retry.op_timeout();
    let source = CloudStore::from_config("source", &config.source, timeout)
        .with_context(|| format!("failed to open source store {}", config.source.describe()))?;
    let target = CloudStore::from_config("target", &config.target, timeout)
        .with_context(|| format!("failed to open target store {}", config.target.describe()))?;
    tracing::debug!(
        source = %config.source.describe(),
        target = %config.target.describe(),
        "stores configured"
    );
    Ok((Arc::new(source), Arc::new(target)))
}
