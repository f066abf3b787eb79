//! Consent management - the state machine gating third-party analytics.
//!
//! The controller moves through:
//! 1. **Unknown**: nothing stored; the banner is shown immediately
//! 2. **BannerVisible**: waiting for accept / reject / manage
//! 3. **Granted / Denied**: a decision is stored and applied
//! 4. **ModalOpen**: preference review, opened from any of the above
//!
//! It never touches cookie text itself: persistence goes through
//! [`ConsentStore`] and script handling through [`AnalyticsLoader`].

mod analytics;
mod decision;
mod store;

pub use analytics::*;
pub use decision::*;
pub use store::*;

use page_model::{ConsentElements, ElementAccess, ElementId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which state a dismissed preferences modal returns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModalOrigin {
    Banner,
    Granted,
    Denied,
}

impl ModalOrigin {
    fn state(self) -> ConsentState {
        match self {
            ModalOrigin::Banner => ConsentState::BannerVisible,
            ModalOrigin::Granted => ConsentState::Granted,
            ModalOrigin::Denied => ConsentState::Denied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentState {
    Unknown,
    BannerVisible,
    Granted,
    Denied,
    ModalOpen { from: ModalOrigin },
}

impl ConsentState {
    fn modal_origin(self) -> ModalOrigin {
        match self {
            ConsentState::Granted => ModalOrigin::Granted,
            ConsentState::Denied => ModalOrigin::Denied,
            ConsentState::ModalOpen { from } => from,
            ConsentState::Unknown | ConsentState::BannerVisible => ModalOrigin::Banner,
        }
    }
}

/// What a wired control does when clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentAction {
    AcceptAll,
    RejectNonEssential,
    ManagePreferences,
    SavePreferences,
    CloseModal,
}

/// Drives the consent banner and preferences modal.
pub struct ConsentController {
    elements: Arc<dyn ElementAccess>,
    store: ConsentStore,
    analytics: Arc<AnalyticsLoader>,
    ids: ConsentElements,
    state: ConsentState,
    wired: BTreeMap<ElementId, ConsentAction>,
    missing: BTreeSet<ElementId>,
}

impl ConsentController {
    pub fn new(
        elements: Arc<dyn ElementAccess>,
        store: ConsentStore,
        analytics: Arc<AnalyticsLoader>,
        ids: ConsentElements,
    ) -> Self {
        Self {
            elements,
            store,
            analytics,
            ids,
            state: ConsentState::Unknown,
            wired: BTreeMap::new(),
            missing: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> ConsentState {
        self.state
    }

    pub fn analytics(&self) -> &Arc<AnalyticsLoader> {
        &self.analytics
    }

    /// Controls currently wired, by element id.
    pub fn wired_controls(&self) -> &BTreeMap<ElementId, ConsentAction> {
        &self.wired
    }

    /// Controls looked up by `bind` and not found yet.
    pub fn missing_controls(&self) -> &BTreeSet<ElementId> {
        &self.missing
    }

    /// Apply the stored decision, or prompt for one, then wire the controls.
    pub fn init(&mut self) {
        match self.store.load() {
            None => {
                self.transition(ConsentState::Unknown);
                self.show(&self.ids.banner);
                self.transition(ConsentState::BannerVisible);
            }
            Some(decision) if decision.analytics_enabled => {
                self.transition(ConsentState::Granted);
                self.analytics.enable();
            }
            Some(_) => self.transition(ConsentState::Denied),
        }
        self.bind();
    }

    /// Wire every consent control present in the document and bring the
    /// banner/modal visibility in line with the current state.
    ///
    /// Safe to call again once more markup arrives: controls already wired are
    /// kept, newly present ones are added. Returns the number newly wired.
    pub fn bind(&mut self) -> usize {
        let controls = [
            (self.ids.accept.clone(), ConsentAction::AcceptAll),
            (self.ids.reject.clone(), ConsentAction::RejectNonEssential),
            (self.ids.manage.clone(), ConsentAction::ManagePreferences),
            (self.ids.footer_settings.clone(), ConsentAction::ManagePreferences),
            (self.ids.save.clone(), ConsentAction::SavePreferences),
            (self.ids.close.clone(), ConsentAction::CloseModal),
            // A click whose target is the modal itself landed outside its content.
            (self.ids.modal.clone(), ConsentAction::CloseModal),
        ];

        let mut newly_wired = 0;
        for (id, action) in controls {
            if self.wired.contains_key(&id) {
                continue;
            }
            if self.elements.exists(&id) {
                self.missing.remove(&id);
                self.wired.insert(id, action);
                newly_wired += 1;
            } else if self.missing.insert(id.clone()) {
                warn!(control = %id, "consent control not found; listener not attached");
            } else {
                debug!(control = %id, "consent control still missing");
            }
        }
        self.render();
        newly_wired
    }

    /// Route a click on `target` to its action. Returns `false` if the
    /// target is not a wired control.
    pub fn dispatch_click(&mut self, target: &ElementId) -> bool {
        let Some(action) = self.wired.get(target).copied() else {
            return false;
        };
        match action {
            ConsentAction::AcceptAll => self.accept_all(),
            ConsentAction::RejectNonEssential => self.reject_non_essential(),
            ConsentAction::ManagePreferences => self.open_preferences(),
            ConsentAction::SavePreferences => self.save_preferences(),
            ConsentAction::CloseModal => self.close_modal(),
        }
        true
    }

    pub fn accept_all(&mut self) {
        self.decide(true);
        self.hide(&self.ids.banner);
    }

    pub fn reject_non_essential(&mut self) {
        self.decide(false);
        self.hide(&self.ids.banner);
    }

    /// Open the preferences modal with its toggle reflecting the stored decision.
    pub fn open_preferences(&mut self) {
        let Some(modal) = self.elements.get_element_by_id(&self.ids.modal) else {
            warn!(control = %self.ids.modal, "consent modal not found");
            return;
        };
        self.elements.add_class(modal, &self.ids.visible_class);

        if let Some(decision) = self.store.load() {
            if let Some(toggle) = self.elements.get_element_by_id(&self.ids.analytics_toggle) {
                self.elements.set_checked(toggle, decision.analytics_enabled);
            }
        }

        let from = self.state.modal_origin();
        self.transition(ConsentState::ModalOpen { from });
    }

    /// Persist and apply the modal's toggle, then close the modal and banner.
    pub fn save_preferences(&mut self) {
        let checked = self
            .elements
            .get_element_by_id(&self.ids.analytics_toggle)
            .and_then(|toggle| self.elements.is_checked(toggle));
        let Some(analytics_enabled) = checked else {
            warn!(control = %self.ids.analytics_toggle, "analytics toggle not found; preferences not saved");
            return;
        };

        self.decide(analytics_enabled);
        self.hide(&self.ids.modal);
        self.hide(&self.ids.banner);
        self.transition(self.state.modal_origin().state());
    }

    /// Dismiss the modal without recording anything.
    pub fn close_modal(&mut self) {
        self.hide(&self.ids.modal);
        if let ConsentState::ModalOpen { from } = self.state {
            self.transition(from.state());
        }
    }

    /// Persist first, then apply. A failed write is logged and the choice is
    /// still applied to the live page.
    fn decide(&mut self, analytics_enabled: bool) {
        let decision = ConsentDecision::new(analytics_enabled);
        if let Err(err) = self.store.save(&decision) {
            error!(error = %err, "failed to persist consent decision");
        }

        if analytics_enabled {
            self.analytics.enable();
        } else {
            self.analytics.disable();
        }
        info!(analytics = analytics_enabled, "consent decision recorded");

        let origin = if analytics_enabled {
            ModalOrigin::Granted
        } else {
            ModalOrigin::Denied
        };
        let next = match self.state {
            ConsentState::ModalOpen { .. } => ConsentState::ModalOpen { from: origin },
            _ => origin.state(),
        };
        self.transition(next);
    }

    fn transition(&mut self, next: ConsentState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "consent state transition");
        }
        self.state = next;
    }

    /// Banner and modal may be injected after `init`; re-apply their visibility.
    fn render(&self) {
        let banner_visible = matches!(
            self.state,
            ConsentState::BannerVisible
                | ConsentState::ModalOpen {
                    from: ModalOrigin::Banner
                }
        );
        let modal_visible = matches!(self.state, ConsentState::ModalOpen { .. });

        for (id, visible) in [(&self.ids.banner, banner_visible), (&self.ids.modal, modal_visible)] {
            if let Some(node) = self.elements.get_element_by_id(id) {
                if visible {
                    self.elements.add_class(node, &self.ids.visible_class);
                } else {
                    self.elements.remove_class(node, &self.ids.visible_class);
                }
            }
        }
    }

    fn show(&self, id: &ElementId) {
        match self.elements.get_element_by_id(id) {
            Some(node) => self.elements.add_class(node, &self.ids.visible_class),
            None => warn!(control = %id, "consent element not found"),
        }
    }

    fn hide(&self, id: &ElementId) {
        if let Some(node) = self.elements.get_element_by_id(id) {
            self.elements.remove_class(node, &self.ids.visible_class);
        }
    }
}
