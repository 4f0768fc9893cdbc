//! Overlapping container.

use std::rc::Rc;

use crate::error::{ChartError, Result};
use crate::geom::Point;
use crate::surface::ChartSurface;
use crate::svg::NodeId;

use super::{
    Component, ComponentBase, ComponentId, ComponentRef, LayoutOffer, Shared, SpaceRequest,
    adopt_child, anchor_component, detach, layout_component, render_children, share,
};

/// Children share the group's origin and are drawn in order, last on top.
pub struct Group {
    base: ComponentBase,
    children: Vec<ComponentRef>,
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl Group {
    /// Create an empty group.
    pub fn new() -> Self {
        Self {
            base: ComponentBase::new("component-group"),
            children: Vec::new(),
        }
    }

    /// Create a shared group holding `children`, first at the bottom.
    pub fn with_children(children: Vec<ComponentRef>) -> Result<Shared<Group>> {
        let group = share(Group::new());
        for child in children {
            group.borrow_mut().add(child)?;
        }
        Ok(group)
    }

    /// Append `child` to the group behind the handle.
    pub fn append(group: &ComponentRef, child: ComponentRef) -> Result<()> {
        let mut inner = group.borrow_mut();
        inner.base().hook().bind(Rc::downgrade(group));
        match inner.as_group_mut() {
            Some(group) => group.add(child),
            None => Ok(()),
        }
    }

    /// Insert `child` at the bottom of the group behind the handle.
    pub fn prepend(group: &ComponentRef, child: ComponentRef) -> Result<()> {
        let mut inner = group.borrow_mut();
        inner.base().hook().bind(Rc::downgrade(group));
        match inner.as_group_mut() {
            Some(group) => group.add_first(child),
            None => Ok(()),
        }
    }

    /// Add a child on top.
    pub fn add(&mut self, child: ComponentRef) -> Result<()> {
        self.insert(child, false)
    }

    /// Add a child at the bottom.
    pub fn add_first(&mut self, child: ComponentRef) -> Result<()> {
        self.insert(child, true)
    }

    /// Children, bottom first.
    pub fn components(&self) -> &[ComponentRef] {
        &self.children
    }

    /// Check whether `child` is in the group.
    pub fn has(&self, child: &ComponentRef) -> bool {
        self.children.iter().any(|existing| Rc::ptr_eq(existing, child))
    }

    fn insert(&mut self, child: ComponentRef, first: bool) -> Result<()> {
        let (child_id, removed, parent) = {
            let Ok(inner) = child.try_borrow() else {
                return Err(ChartError::ComponentBusy);
            };
            (
                inner.base().id(),
                inner.base().is_removed(),
                inner.base().parent(),
            )
        };
        if removed {
            return Err(ChartError::ComponentRemoved(child_id.get()));
        }
        if child_id == self.base.id() {
            return Err(ChartError::AlreadyAnchored(child_id.get()));
        }
        self.children.retain(|existing| !Rc::ptr_eq(existing, &child));
        if let Some(parent) = parent {
            let elsewhere = parent
                .try_borrow()
                .map(|parent| parent.base().id() != self.base.id())
                .unwrap_or(false);
            if elsewhere {
                detach(&child);
            }
        }
        if first {
            self.children.insert(0, child.clone());
        } else {
            self.children.push(child.clone());
        }
        let content = self.base.content();
        adopt_child(&self.base, &child, content);
        if first
            && let (Some(surface), Some(content), Ok(inner)) =
                (self.base.surface(), content, child.try_borrow())
            && let Some(element) = inner.base().element()
        {
            surface.document_mut().insert_child(content, 0, element);
        }
        self.base.hook().request_layout();
        Ok(())
    }
}

impl Component for Group {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn requested_space(&self, available_width: f64, available_height: f64) -> SpaceRequest {
        let mut request = SpaceRequest::default();
        for child in &self.children {
            if let Ok(child) = child.try_borrow() {
                let child_request = child.requested_space(available_width, available_height);
                request.min_width = request.min_width.max(child_request.min_width);
                request.min_height = request.min_height.max(child_request.min_height);
            }
        }
        request
    }

    fn is_fixed_width(&self) -> bool {
        self.children
            .iter()
            .all(|child| child.try_borrow().is_ok_and(|child| child.is_fixed_width()))
    }

    fn is_fixed_height(&self) -> bool {
        self.children
            .iter()
            .all(|child| child.try_borrow().is_ok_and(|child| child.is_fixed_height()))
    }

    fn size_from_offer(&self, available_width: f64, available_height: f64) -> (f64, f64) {
        (available_width, available_height)
    }

    fn anchor(&mut self, surface: &ChartSurface, parent: NodeId) {
        anchor_component(self, surface, parent);
        let content = self.base.content();
        for child in &self.children {
            adopt_child(&self.base, child, content);
        }
    }

    fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
        layout_component(self, offer);
        let offer = LayoutOffer::new(Point::default(), self.base.width(), self.base.height());
        for child in &self.children {
            if let Ok(mut child) = child.try_borrow_mut() {
                child.compute_layout(Some(offer));
            }
        }
    }

    fn render_immediately(&mut self) {
        render_children(&self.children);
    }

    fn children(&self) -> Vec<ComponentRef> {
        self.children.clone()
    }

    fn remove_child(&mut self, id: ComponentId) -> Option<ComponentRef> {
        let index = self
            .children
            .iter()
            .position(|child| child.try_borrow().is_ok_and(|child| child.base().id() == id))?;
        Some(self.children.remove(index))
    }

    fn as_group_mut(&mut self) -> Option<&mut Group> {
        Some(self)
    }
}
