//! Technology groups are named sets of processes sharing an aggregate capacity bound.
use crate::id::define_id_type;
use crate::process::ProcessID;
use crate::site::SiteID;
use crate::table::{Cell, IndexKey};
use indexmap::{IndexMap, IndexSet};

define_id_type! {TechGroupID}

/// The member processes of each technology group
pub type TechGroupMap = IndexMap<TechGroupID, IndexSet<ProcessID>>;

/// Aggregate capacity bounds, keyed by year, site and technology group
pub type TechGroupBoundsMap = IndexMap<TechGroupKey, TechGroupBounds>;

/// Identifies a technology group at a site in a given support timeframe
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TechGroupKey {
    /// Support timeframe
    pub year: u32,
    /// Site the bound applies to
    pub site: SiteID,
    /// The technology group
    pub techgroup: TechGroupID,
}

impl IndexKey for TechGroupKey {
    fn index_names() -> Vec<&'static str> {
        vec!["stf", "sit", "techgroup"]
    }

    fn index_cells(&self) -> Vec<Cell> {
        vec![
            self.year.into(),
            Cell::text(&self.site),
            Cell::text(&self.techgroup),
        ]
    }
}

/// Lower and upper bound on the summed capacity of a group's members
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechGroupBounds {
    pub cap_lo: f64,
    pub cap_up: f64,
}
