//! Code for reading the sites file.
use super::*;
use crate::site::{SiteID, SiteTupleSet};
use serde::Deserialize;

/// Name of the sites file
pub const SITE_FILE_NAME: &str = "site.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct SiteRaw {
    support_timeframe: u32,
    site: String,
}

/// Read the (support timeframe, site) combinations from the sites file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_sites(model_dir: &Path) -> Result<SiteTupleSet> {
    let file_path = model_dir.join(SITE_FILE_NAME);
    let sites_csv = read_csv(&file_path)?;
    read_sites_from_iter(sites_csv).with_context(|| input_err_msg(&file_path))
}

fn read_sites_from_iter<I>(iter: I) -> Result<SiteTupleSet>
where
    I: Iterator<Item = SiteRaw>,
{
    let mut site_tuples = SiteTupleSet::new();
    for site in iter {
        ensure!(!site.site.is_empty(), "Site names cannot be empty");
        let id: SiteID = site.site.into();
        ensure!(
            site_tuples.insert((site.support_timeframe, id.clone())),
            "Site {id} is defined more than once for {}",
            site.support_timeframe
        );
    }

    Ok(site_tuples)
}
