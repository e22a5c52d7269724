//! Aggregate capacity bounds for technology groups.
use crate::model::Model;
use crate::optimisation::{Constraint, KeysWithOffset, OptimisationModel};
use crate::process::ProcessKey;
use crate::techgroup::TechGroupKey;
use log::info;

/// Add `cap_lo <= Σ cap_pro <= cap_up` over the members of each technology group, per support
/// timeframe and site.
///
/// Every member of a bounded group has a process at the site and support timeframe of the bound,
/// as checked when the model is loaded.
///
/// # Returns
///
/// The keys of the constraints, or `None` if the model defines no technology groups.
pub fn add_tech_group_constraints(
    opt: &mut OptimisationModel,
    model: &Model,
) -> Option<KeysWithOffset<TechGroupKey>> {
    if model.tech_groups.is_empty() {
        info!("No tech group is defined.");
        return None;
    }

    let index: Vec<_> = model.tech_group_bounds.keys().cloned().collect();
    let keys = opt.add_constraints("res_techgroup_capacity", index, |variables, key| {
        let bounds = model.tech_group_bounds[key];
        let terms = model.tech_groups[&key.techgroup]
            .iter()
            .map(|process| {
                let var = variables
                    .cap_pro
                    .var(&ProcessKey::new(key.year, &key.site, process));
                (var, 1.0)
            })
            .collect();
        Some(Constraint::between(terms, bounds.cap_lo, bounds.cap_up))
    });

    Some(keys)
}
