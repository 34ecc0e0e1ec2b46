use std::collections::{BTreeMap, BTreeSet};

use crate::models::WalletCluster;

/// Smallest group reported as a possible coordinated cluster
pub const MIN_CLUSTER_SIZE: usize = 2;

/// Group wallets by funding source, keeping groups of at least [`MIN_CLUSTER_SIZE`].
///
/// Largest clusters first, ties by funding source.
pub fn build_clusters<'a, I>(wallets: I) -> Vec<WalletCluster>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut by_funder: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (wallet, funder) in wallets {
        if let Some(funder) = funder {
            by_funder.entry(funder).or_default().insert(wallet);
        }
    }

    let mut clusters: Vec<WalletCluster> = by_funder
        .into_iter()
        .filter(|(_, wallets)| wallets.len() >= MIN_CLUSTER_SIZE)
        .map(|(funder, wallets)| WalletCluster {
            funding_source: funder.to_string(),
            count: wallets.len(),
            wallets: wallets.into_iter().map(String::from).collect(),
        })
        .collect();

    clusters.sort_by(|a, b| b.count.cmp(&a.count));
    clusters
}
