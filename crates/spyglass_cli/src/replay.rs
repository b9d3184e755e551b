//! Scenario replay against the headless host

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;
use spyglass_core::headless::{HeadlessHost, NodeId, SurfaceId};
use spyglass_core::{Extent, Host, Offset, Scheduler, SpyCallback, SpyEvent, Spyglass};
use tracing::{debug, info};

use crate::config::{Scenario, StepConfig};

/// One dispatched state change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub time_ms: u64,
    pub id: String,
    pub element: String,
    pub state: &'static str,
    pub inside: bool,
}

/// Run a scenario and collect every transition in dispatch order
///
/// After the last step the clock is advanced past the throttle window so
/// trailing checks are included.
pub fn run(scenario: &Scenario) -> Result<Vec<Transition>> {
    let viewport = &scenario.viewport;
    let host = Rc::new(HeadlessHost::new(viewport.width, viewport.height));

    let context = if viewport.is_container() {
        host.add_surface(
            Offset::new(
                viewport.offset_top.unwrap_or_default(),
                viewport.offset_left.unwrap_or_default(),
            ),
            Extent::new(viewport.width, viewport.height),
        )
    } else {
        host.root()
    };

    let mut nodes = Vec::with_capacity(scenario.elements.len());
    let mut names: FxHashMap<NodeId, String> = FxHashMap::default();
    for element in &scenario.elements {
        let node = host.add_node(
            Offset::new(element.top, element.left),
            Extent::new(element.width, element.height),
        );
        names.insert(node, element.name.clone());
        nodes.push(node);
    }

    let transitions = Rc::new(RefCell::new(Vec::new()));
    let recorder = transition_recorder(Rc::clone(&host), names, Rc::clone(&transitions));

    let spyglass = Spyglass::new(
        Rc::clone(&host),
        context,
        scenario.options.clone(),
        Some(recorder),
    )
    .context("Failed to attach to the scenario viewport")?;

    for (element, node) in scenario.elements.iter().zip(&nodes) {
        spyglass.add([*node], None, &element.options)?;
    }

    for (index, step) in scenario.steps.iter().enumerate() {
        run_step(&host, context, index, step)?;
    }

    // Let any trailing throttled check run
    host.advance(spyglass.delay() + Duration::from_millis(1));
    spyglass.destroy();

    let transitions = transitions.take();
    info!(transitions = transitions.len(), "Replay finished");
    Ok(transitions)
}

fn transition_recorder(
    host: Rc<HeadlessHost>,
    names: FxHashMap<NodeId, String>,
    sink: Rc<RefCell<Vec<Transition>>>,
) -> SpyCallback<NodeId> {
    Rc::new(move |event: &SpyEvent<NodeId>| {
        sink.borrow_mut().push(Transition {
            time_ms: host.now().as_millis() as u64,
            id: event.id.to_string(),
            element: names.get(&event.element).cloned().unwrap_or_default(),
            state: event.state_name(),
            inside: event.is_inside(),
        });
    })
}

fn run_step(
    host: &HeadlessHost,
    context: SurfaceId,
    index: usize,
    step: &StepConfig,
) -> Result<()> {
    if let Some(at) = step.at {
        let target = Duration::from_millis(at);
        let now = host.now();
        if target < now {
            anyhow::bail!(
                "Step {} runs at {}ms but the clock is already at {}ms",
                index,
                at,
                now.as_millis()
            );
        }
        host.advance(target - now);
    }

    debug!(step = index, time_ms = host.now().as_millis() as u64, "Running step");

    if step.scrolls() {
        let current = host.scroll_position(&context)?;
        host.scroll_to(
            context,
            step.scroll_top.unwrap_or(current.top),
            step.scroll_left.unwrap_or(current.left),
        );
    }

    if step.resizes() {
        let current = host.inner_size(&context)?;
        host.resize(
            context,
            step.width.unwrap_or(current.width),
            step.height.unwrap_or(current.height),
        );
    }

    if let Some(advance) = step.advance {
        host.advance(Duration::from_millis(advance));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states(transitions: &[Transition]) -> Vec<(u64, &str, &str)> {
        transitions
            .iter()
            .map(|t| (t.time_ms, t.element.as_str(), t.state))
            .collect()
    }

    #[test]
    fn test_replay_reports_initial_and_scrolled_states() {
        let scenario = Scenario::parse(
            r#"
            [viewport]
            height = 500

            [[element]]
            name = "hero"
            top = 100
            height = 50

            [[element]]
            name = "footer"
            top = 600

            [[step]]
            at = 0
            scroll_top = 300

            [[step]]
            at = 10
            scroll_top = 900
            "#,
        )
        .unwrap();

        let transitions = run(&scenario).unwrap();

        assert_eq!(
            states(&transitions),
            vec![
                (0, "hero", "inside"),
                (0, "footer", "down"),
                (0, "hero", "up"),
                (0, "footer", "inside"),
                (100, "footer", "up"),
            ]
        );
        assert_eq!(transitions[0].id, "s0");
        assert!(transitions[0].inside);
    }

    #[test]
    fn test_replay_in_container() {
        let scenario = Scenario::parse(
            r#"
            [viewport]
            width = 400
            height = 200
            offset_top = 1000

            [[element]]
            name = "row"
            top = 1300
            height = 40

            [[step]]
            scroll_top = 150
            "#,
        )
        .unwrap();

        let transitions = run(&scenario).unwrap();
        assert_eq!(
            states(&transitions),
            vec![(0, "row", "down"), (0, "row", "inside")]
        );
    }

    #[test]
    fn test_replay_resize() {
        let scenario = Scenario::parse(
            r#"
            [viewport]
            height = 800

            [[element]]
            name = "footer"
            top = 700
            height = 50

            [[step]]
            at = 500
            height = 400
            "#,
        )
        .unwrap();

        let transitions = run(&scenario).unwrap();
        assert_eq!(
            states(&transitions),
            vec![(0, "footer", "inside"), (500, "footer", "down")]
        );
    }

    #[test]
    fn test_replay_rejects_steps_out_of_order() {
        let scenario = Scenario::parse(
            r#"
            [[step]]
            at = 100

            [[step]]
            at = 50
            "#,
        )
        .unwrap();

        assert!(run(&scenario).is_err());
    }

    #[test]
    fn test_transition_serializes_as_json() {
        let transition = Transition {
            time_ms: 120,
            id: "s1".to_string(),
            element: "intro".to_string(),
            state: "inside",
            inside: true,
        };

        let json = serde_json::to_string(&transition).unwrap();
        assert_eq!(
            json,
            r#"{"time_ms":120,"id":"s1","element":"intro","state":"inside","inside":true}"#
        );
    }
}
