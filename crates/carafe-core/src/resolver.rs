//! Install-order resolution for pinned resources.
//!
//! Resources carry explicit `requires` edges. Topological sorting (Kahn)
//! turns the declared set into a safe install order, with declaration order
//! as the tie-break so recipes without edges install exactly as written.

use std::collections::HashMap;

use carafe_schema::{ResourceName, ResourceSpec};
use thiserror::Error;

/// Errors from install-order resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A `requires` edge points at a resource that is not declared.
    #[error("resource '{resource}' requires undeclared resource '{requires}'")]
    Unknown {
        /// Resource carrying the bad edge.
        resource: ResourceName,
        /// The missing requirement.
        requires: ResourceName,
    },

    /// The `requires` edges form a cycle; the named resources cannot be
    /// ordered.
    #[error("dependency cycle among resources: {}", remaining.join(", "))]
    Cycle {
        /// Resources left unordered when progress stopped.
        remaining: Vec<String>,
    },
}

/// Compute a safe install order for `resources`, returned as indices into
/// the input slice.
///
/// Every resource is installed after all resources it `requires`. Resources
/// not related by an edge keep their declaration order.
///
/// # Errors
///
/// Returns [`ResolveError::Unknown`] for an edge to an undeclared resource,
/// or [`ResolveError::Cycle`] naming the resources that could not be ordered.
pub fn install_order(resources: &[ResourceSpec]) -> Result<Vec<usize>, ResolveError> {
    let index_of: HashMap<&str, usize> = resources
        .iter()
        .enumerate()
        .map(|(i, r)| (r.name.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; resources.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); resources.len()];

    for (i, resource) in resources.iter().enumerate() {
        for dep in &resource.requires {
            let Some(&j) = index_of.get(dep.as_str()) else {
                return Err(ResolveError::Unknown {
                    resource: resource.name.clone(),
                    requires: dep.clone(),
                });
            };
            dependents[j].push(i);
            in_degree[i] += 1;
        }
    }

    // Stable Kahn: always pick the lowest-index ready resource next. The
    // sets here are tiny (a recipe pins a handful of archives), so the
    // quadratic scan is irrelevant.
    let mut order = Vec::with_capacity(resources.len());
    let mut placed = vec![false; resources.len()];

    while order.len() < resources.len() {
        let next = (0..resources.len()).find(|&i| !placed[i] && in_degree[i] == 0);
        let Some(i) = next else {
            let remaining = resources
                .iter()
                .enumerate()
                .filter(|(i, _)| !placed[*i])
                .map(|(_, r)| r.name.to_string())
                .collect();
            return Err(ResolveError::Cycle { remaining });
        };
        placed[i] = true;
        order.push(i);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
        }
    }

    Ok(order)
}
