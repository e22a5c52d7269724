//! Sites are the geographical nodes of the energy system (e.g. countries or grid regions).
use crate::id::define_id_type;
use indexmap::IndexSet;

define_id_type! {SiteID}

/// The (support timeframe, site) combinations defined for a model
pub type SiteTupleSet = IndexSet<(u32, SiteID)>;
