//! Startup ordering for service definitions.
//!
//! Order is a post-order depth-first walk over `depends_on` edges, so every
//! dependency is emitted before its dependents. Stages group services by
//! dependency depth: depth 0 has no dependencies, and a service sits one
//! stage after its deepest dependency.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::service::Service;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Dependency-respecting start order, visiting names and dependencies sorted.
///
/// # Errors
///
/// [`Error::UnknownDependency`] if a `depends_on` entry is not defined,
/// [`Error::DependencyCycle`] if services depend on each other in a loop.
pub fn startup_order(services: &BTreeMap<String, Service>) -> Result<Vec<String>> {
    let mut marks = BTreeMap::new();
    let mut path = Vec::new();
    let mut order = Vec::with_capacity(services.len());

    for name in services.keys() {
        visit(name, services, &mut marks, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit<'a>(
    name: &'a str,
    services: &'a BTreeMap<String, Service>,
    marks: &mut BTreeMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    order: &mut Vec<String>,
) -> Result<()> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => {
            let start = path.iter().position(|n| *n == name).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
            cycle.push(name.to_string());
            return Err(Error::DependencyCycle { cycle });
        }
        None => {}
    }

    let Some(service) = services.get(name) else {
        return Ok(());
    };

    marks.insert(name, Mark::InProgress);
    path.push(name);

    let mut deps: Vec<&str> = service.depends_on.iter().map(String::as_str).collect();
    deps.sort_unstable();
    deps.dedup();
    for dep in deps {
        let Some((dep_key, _)) = services.get_key_value(dep) else {
            return Err(Error::UnknownDependency {
                service: name.to_string(),
                dependency: dep.to_string(),
            });
        };
        visit(dep_key, services, marks, path, order)?;
    }

    path.pop();
    marks.insert(name, Mark::Done);
    order.push(name.to_string());
    Ok(())
}

/// Group services into startup stages by dependency depth, each stage sorted.
pub fn startup_stages(services: &BTreeMap<String, Service>) -> Result<Vec<Vec<String>>> {
    let order = startup_order(services)?;
    let mut depth: BTreeMap<&str, usize> = BTreeMap::new();
    let mut stages: Vec<Vec<String>> = Vec::new();

    for name in &order {
        let level = services
            .get(name)
            .into_iter()
            .flat_map(|s| s.depends_on.iter())
            .filter_map(|dep| depth.get(dep.as_str()))
            .map(|d| d + 1)
            .max()
            .unwrap_or(0);
        depth.insert(name, level);
        if stages.len() <= level {
            stages.resize_with(level + 1, Vec::new);
        }
        stages[level].push(name.clone());
    }

    for stage in &mut stages {
        stage.sort();
    }
    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn services(entries: &[(&str, &[&str])]) -> BTreeMap<String, Service> {
        entries
            .iter()
            .map(|&(name, deps)| {
                (
                    name.to_string(),
                    Service::new(name, format!("run-{name}")).depends_on(deps.iter().copied()),
                )
            })
            .collect()
    }

    #[test]
    fn chain_is_ordered_dependencies_first() {
        let defs = services(&[("web", &["api"]), ("api", &["db"]), ("db", &[])]);
        assert_eq!(startup_order(&defs).unwrap(), vec!["db", "api", "web"]);
        assert_eq!(
            startup_stages(&defs).unwrap(),
            vec![vec!["db".to_string()], vec!["api".to_string()], vec!["web".to_string()]]
        );
    }

    #[test]
    fn independent_services_share_a_stage() {
        let defs = services(&[
            ("cache", &[]),
            ("db", &[]),
            ("api", &["db", "cache"]),
            ("worker", &["db"]),
            ("web", &["api"]),
        ]);
        assert_eq!(
            startup_stages(&defs).unwrap(),
            vec![
                vec!["cache".to_string(), "db".to_string()],
                vec!["api".to_string(), "worker".to_string()],
                vec!["web".to_string()],
            ]
        );
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let defs = services(&[("api", &["db"])]);
        assert!(matches!(
            startup_order(&defs),
            Err(Error::UnknownDependency { ref service, ref dependency })
                if service == "api" && dependency == "db"
        ));
    }

    #[test]
    fn cycle_is_reported_with_chain() {
        let defs = services(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        match startup_order(&defs) {
            Err(Error::DependencyCycle { cycle }) => assert_eq!(cycle, vec!["a", "b", "c", "a"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn empty_definitions() {
        assert!(startup_stages(&BTreeMap::new()).unwrap().is_empty());
    }
}
