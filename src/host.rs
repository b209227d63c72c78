use std::{collections::BTreeMap, fmt};

use crate::view::{WidgetState, WidgetView};

/// Opaque id of one placed widget instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Names the provider whose instances a host tracks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetKind(String);

impl WidgetKind {
    pub const DEFAULT: &'static str = "nowplaying.album4x4";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WidgetKind {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shell that owns the widget instances and applies views to them.
pub trait WidgetHost {
    fn instance_ids(&self, kind: &WidgetKind) -> Vec<InstanceId>;
    fn apply(&mut self, ids: &[InstanceId], view: &WidgetView);
}

pub fn has_instances<H: WidgetHost + ?Sized>(host: &H, kind: &WidgetKind) -> bool {
    !host.instance_ids(kind).is_empty()
}

/// Applies `view` to exactly `ids` when given, otherwise to every instance
/// of `kind`. Returns the number of ids the view was sent to.
pub fn publish<H: WidgetHost + ?Sized>(
    host: &mut H,
    kind: &WidgetKind,
    ids: Option<&[InstanceId]>,
    view: &WidgetView,
) -> usize {
    match ids {
        Some(ids) => {
            host.apply(ids, view);
            ids.len()
        }
        None => {
            let all = host.instance_ids(kind);
            host.apply(&all, view);
            all.len()
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostedInstance {
    pub kind: WidgetKind,
    pub state: WidgetState,
    pub updates: u64,
}

/// Host that keeps every instance's realized state in memory.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    instances: BTreeMap<InstanceId, HostedInstance>,
    next_id: u32,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instance(&mut self, kind: WidgetKind) -> InstanceId {
        self.next_id += 1;
        let id = InstanceId(self.next_id);
        self.instances.insert(
            id,
            HostedInstance {
                kind,
                state: WidgetState::template(),
                updates: 0,
            },
        );
        id
    }

    pub fn remove_instance(&mut self, id: InstanceId) -> bool {
        self.instances.remove(&id).is_some()
    }

    pub fn instance(&self, id: InstanceId) -> Option<&HostedInstance> {
        self.instances.get(&id)
    }

    pub fn state(&self, id: InstanceId) -> Option<&WidgetState> {
        self.instances.get(&id).map(|instance| &instance.state)
    }

    pub fn updates(&self, id: InstanceId) -> u64 {
        self.instances
            .get(&id)
            .map(|instance| instance.updates)
            .unwrap_or(0)
    }
}

impl WidgetHost for InMemoryHost {
    fn instance_ids(&self, kind: &WidgetKind) -> Vec<InstanceId> {
        self.instances
            .iter()
            .filter(|(_, instance)| &instance.kind == kind)
            .map(|(id, _)| *id)
            .collect()
    }

    fn apply(&mut self, ids: &[InstanceId], view: &WidgetView) {
        for id in ids {
            match self.instances.get_mut(id) {
                Some(instance) => {
                    instance.state.apply(view);
                    instance.updates += 1;
                }
                None => tracing::warn!("Ignoring update for unknown widget instance {id}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewId;

    fn titled(title: &str) -> WidgetView {
        let mut view = WidgetView::new();
        view.set_text(ViewId::Title, title);
        view
    }

    #[test]
    fn explicit_ids_update_exactly_those() {
        let kind = WidgetKind::default();
        let mut host = InMemoryHost::new();
        let a = host.add_instance(kind.clone());
        let b = host.add_instance(kind.clone());
        let c = host.add_instance(kind.clone());

        let sent = publish(&mut host, &kind, Some(&[a, c]), &titled("x"));
        assert_eq!(sent, 2);
        assert_eq!(host.updates(a), 1);
        assert_eq!(host.updates(b), 0);
        assert_eq!(host.updates(c), 1);
        assert_eq!(host.state(b).and_then(|s| s.text(ViewId::Title)), None);
    }

    #[test]
    fn no_ids_update_every_instance_of_kind() {
        let kind = WidgetKind::default();
        let other = WidgetKind::new("nowplaying.small");
        let mut host = InMemoryHost::new();
        let a = host.add_instance(kind.clone());
        let b = host.add_instance(kind.clone());
        let foreign = host.add_instance(other);

        let sent = publish(&mut host, &kind, None, &titled("y"));
        assert_eq!(sent, 2);
        assert_eq!(host.updates(a), 1);
        assert_eq!(host.updates(b), 1);
        assert_eq!(host.updates(foreign), 0);
    }

    #[test]
    fn publish_without_instances_is_a_no_op() {
        let kind = WidgetKind::default();
        let mut host = InMemoryHost::new();
        assert!(!has_instances(&host, &kind));
        assert_eq!(publish(&mut host, &kind, None, &titled("z")), 0);
    }

    #[test]
    fn removed_instances_are_forgotten() {
        let kind = WidgetKind::default();
        let mut host = InMemoryHost::new();
        let id = host.add_instance(kind.clone());
        assert!(has_instances(&host, &kind));
        assert!(host.remove_instance(id));
        assert!(!has_instances(&host, &kind));
        publish(&mut host, &kind, Some(&[id]), &titled("gone"));
        assert!(host.instance(id).is_none());
    }
}
