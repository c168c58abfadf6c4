//! The `com.canonical.dbusmenu` object referenced by the item's `Menu` property
//!
//! The menu is built once with two leaves, "Properties" and "Quit", and never
//! changes afterwards, so the layout revision stays constant and no update
//! signals are ever emitted.

use crate::item::Callback;
use std::collections::HashMap;
use tracing::{debug, warn};
use zbus::fdo;
use zbus::interface;
use zbus::zvariant::{OwnedValue, StructureBuilder, Type, Value};

const ROOT_ID: i32 = 0;
pub const PROPERTIES_ID: i32 = 1;
pub const QUIT_ID: i32 = 2;

const LAYOUT_REVISION: u32 = 1;

type Properties = HashMap<&'static str, Value<'static>>;

/// One node of the menu layout, `(ia{sv}av)` on the wire.
#[derive(Debug, serde::Serialize, Type)]
pub struct Layout {
    id: i32,
    properties: Properties,
    children: Vec<Value<'static>>,
}

impl Layout {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn children(&self) -> &[Value<'static>] {
        &self.children
    }

    pub fn property(&self, name: &str) -> Option<&Value<'static>> {
        self.properties.get(name)
    }

    fn into_value(self) -> Value<'static> {
        StructureBuilder::new()
            .add_field(self.id)
            .add_field(self.properties)
            .add_field(self.children)
            .build()
            .into()
    }
}

struct MenuEntry {
    id: i32,
    label: &'static str,
    icon_name: &'static str,
    on_activate: Callback,
}

impl MenuEntry {
    fn properties(&self, filter: &[String]) -> Properties {
        let all = [
            ("type", Value::from("standard")),
            ("label", Value::from(self.label)),
            ("icon-name", Value::from(self.icon_name)),
            ("enabled", Value::from(true)),
            ("visible", Value::from(true)),
        ];
        all.into_iter()
            .filter(|(name, _)| filter.is_empty() || filter.iter().any(|f| f == name))
            .collect()
    }
}

pub struct DbusMenu {
    entries: Vec<MenuEntry>,
}

impl DbusMenu {
    pub fn new(on_properties: Callback, on_quit: Callback) -> Self {
        Self {
            entries: vec![
                MenuEntry {
                    id: PROPERTIES_ID,
                    label: "_Properties",
                    icon_name: "document-properties",
                    on_activate: on_properties,
                },
                MenuEntry {
                    id: QUIT_ID,
                    label: "_Quit",
                    icon_name: "application-exit",
                    on_activate: on_quit,
                },
            ],
        }
    }

    fn entry(&self, id: i32) -> Option<&MenuEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    fn root_properties(filter: &[String]) -> Properties {
        let mut properties = Properties::new();
        if filter.is_empty() || filter.iter().any(|f| f == "children-display") {
            properties.insert("children-display", Value::from("submenu"));
        }
        properties
    }

    fn node_properties(&self, id: i32, filter: &[String]) -> Option<Properties> {
        if id == ROOT_ID {
            return Some(Self::root_properties(filter));
        }
        self.entry(id).map(|entry| entry.properties(filter))
    }

    fn layout(&self, parent_id: i32, depth: i32, filter: &[String]) -> Option<Layout> {
        let properties = self.node_properties(parent_id, filter)?;
        let children = if parent_id == ROOT_ID && depth != 0 {
            self.entries
                .iter()
                .map(|entry| {
                    Layout {
                        id: entry.id,
                        properties: entry.properties(filter),
                        children: Vec::new(),
                    }
                    .into_value()
                })
                .collect()
        } else {
            Vec::new()
        };

        Some(Layout {
            id: parent_id,
            properties,
            children,
        })
    }

    /// Run the callback bound to `id`. Returns false for ids without one.
    fn activate(&self, id: i32) -> bool {
        let Some(entry) = self.entry(id) else {
            return false;
        };
        debug!("Menu entry {} activated", entry.label);
        if let Err(e) = (entry.on_activate)() {
            warn!("Menu callback for {} failed: {}", entry.label, e);
        }
        true
    }

    fn dispatch(&self, id: i32, event_id: &str) -> fdo::Result<()> {
        if id != ROOT_ID && self.entry(id).is_none() {
            return Err(fdo::Error::InvalidArgs(format!("No menu item with id {}", id)));
        }
        if event_id == "clicked" {
            self.activate(id);
        }
        Ok(())
    }
}

#[interface(name = "com.canonical.dbusmenu")]
impl DbusMenu {
    fn get_layout(
        &self,
        parent_id: i32,
        recursion_depth: i32,
        property_names: Vec<String>,
    ) -> fdo::Result<(u32, Layout)> {
        self.layout(parent_id, recursion_depth, &property_names)
            .map(|layout| (LAYOUT_REVISION, layout))
            .ok_or_else(|| fdo::Error::InvalidArgs(format!("No menu item with id {}", parent_id)))
    }

    fn get_group_properties(
        &self,
        ids: Vec<i32>,
        property_names: Vec<String>,
    ) -> Vec<(i32, Properties)> {
        let ids = if ids.is_empty() {
            std::iter::once(ROOT_ID)
                .chain(self.entries.iter().map(|entry| entry.id))
                .collect()
        } else {
            ids
        };

        ids.into_iter()
            .filter_map(|id| {
                self.node_properties(id, &property_names)
                    .map(|properties| (id, properties))
            })
            .collect()
    }

    fn get_property(&self, id: i32, name: String) -> fdo::Result<Value<'static>> {
        self.node_properties(id, std::slice::from_ref(&name))
            .and_then(|mut properties| properties.remove(name.as_str()))
            .ok_or_else(|| fdo::Error::InvalidArgs(format!("No property {} on item {}", name, id)))
    }

    fn event(&self, id: i32, event_id: String, _data: OwnedValue, _timestamp: u32) -> fdo::Result<()> {
        self.dispatch(id, &event_id)
    }

    fn event_group(&self, events: Vec<(i32, String, OwnedValue, u32)>) -> fdo::Result<Vec<i32>> {
        let mut errors = Vec::new();
        for (id, event_id, _, _) in &events {
            if self.dispatch(*id, event_id).is_err() {
                errors.push(*id);
            }
        }

        if !events.is_empty() && errors.len() == events.len() {
            return Err(fdo::Error::InvalidArgs("No menu items matched".into()));
        }
        Ok(errors)
    }

    fn about_to_show(&self, _id: i32) -> bool {
        false
    }

    fn about_to_show_group(&self, ids: Vec<i32>) -> (Vec<i32>, Vec<i32>) {
        let errors = ids
            .into_iter()
            .filter(|id| self.node_properties(*id, &[]).is_none())
            .collect();
        (Vec::new(), errors)
    }

    #[zbus(property)]
    fn version(&self) -> u32 {
        3
    }

    #[zbus(property)]
    fn text_direction(&self) -> String {
        "ltr".into()
    }

    #[zbus(property)]
    fn status(&self) -> String {
        "normal".into()
    }

    #[zbus(property)]
    fn icon_theme_path(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixture {
        menu: DbusMenu,
        properties: Arc<AtomicUsize>,
        quit: Arc<AtomicUsize>,
    }

    fn no_data() -> OwnedValue {
        OwnedValue::try_from(Value::from(0i32)).unwrap()
    }

    fn fixture() -> Fixture {
        let properties = Arc::new(AtomicUsize::new(0));
        let quit = Arc::new(AtomicUsize::new(0));
        let menu = DbusMenu::new(
            {
                let properties = properties.clone();
                Arc::new(move || {
                    properties.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            },
            {
                let quit = quit.clone();
                Arc::new(move || {
                    quit.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            },
        );
        Fixture { menu, properties, quit }
    }

    #[test]
    fn test_root_layout_has_two_leaves() {
        let f = fixture();
        let (revision, layout) = f.menu.get_layout(0, -1, Vec::new()).unwrap();

        assert_eq!(revision, LAYOUT_REVISION);
        assert_eq!(layout.id(), 0);
        assert_eq!(layout.children().len(), 2);
        assert_eq!(layout.property("children-display"), Some(&Value::from("submenu")));
    }

    #[test]
    fn test_depth_zero_omits_children() {
        let f = fixture();
        let (_, layout) = f.menu.get_layout(0, 0, Vec::new()).unwrap();
        assert!(layout.children().is_empty());
    }

    #[test]
    fn test_leaf_layout_and_filter() {
        let f = fixture();
        let (_, layout) = f.menu.get_layout(QUIT_ID, -1, vec!["label".into()]).unwrap();

        assert_eq!(layout.id(), QUIT_ID);
        assert_eq!(layout.property("label"), Some(&Value::from("_Quit")));
        assert!(layout.property("icon-name").is_none());
    }

    #[test]
    fn test_unknown_layout_parent() {
        let f = fixture();
        assert!(f.menu.get_layout(99, -1, Vec::new()).is_err());
    }

    #[test]
    fn test_group_properties_defaults_to_all() {
        let f = fixture();
        let groups = f.menu.get_group_properties(Vec::new(), vec!["icon-name".into()]);

        let ids: Vec<i32> = groups.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![ROOT_ID, PROPERTIES_ID, QUIT_ID]);
        assert_eq!(groups[1].1.get("icon-name"), Some(&Value::from("document-properties")));
    }

    #[test]
    fn test_get_property() {
        let f = fixture();
        assert_eq!(
            f.menu.get_property(PROPERTIES_ID, "label".into()).unwrap(),
            Value::from("_Properties")
        );
        assert!(f.menu.get_property(PROPERTIES_ID, "shortcut".into()).is_err());
    }

    #[test]
    fn test_click_runs_bound_callback() {
        let f = fixture();
        f.menu.event(PROPERTIES_ID, "clicked".into(), no_data(), 0).unwrap();
        assert_eq!(f.properties.load(Ordering::SeqCst), 1);
        assert_eq!(f.quit.load(Ordering::SeqCst), 0);

        f.menu.event(QUIT_ID, "hovered".into(), no_data(), 0).unwrap();
        assert_eq!(f.quit.load(Ordering::SeqCst), 0);

        f.menu.event(QUIT_ID, "clicked".into(), no_data(), 0).unwrap();
        assert_eq!(f.quit.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_group_reports_unknown_ids() {
        let f = fixture();
        let errors = f
            .menu
            .event_group(vec![
                (QUIT_ID, "clicked".into(), no_data(), 0),
                (42, "clicked".into(), no_data(), 0),
            ])
            .unwrap();

        assert_eq!(errors, vec![42]);
        assert_eq!(f.quit.load(Ordering::SeqCst), 1);
        assert!(f
            .menu
            .event_group(vec![(42, "clicked".into(), no_data(), 0)])
            .is_err());
    }

    #[test]
    fn test_about_to_show_group() {
        let f = fixture();
        let (updates, errors) = f.menu.about_to_show_group(vec![0, 1, 7]);
        assert!(updates.is_empty());
        assert_eq!(errors, vec![7]);
        assert!(!f.menu.about_to_show(0));
    }
}
