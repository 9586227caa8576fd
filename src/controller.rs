//! Brewing session controller: owns the session state, the step navigation
//! machine and the brew timer, and orchestrates catalogs, persistence and
//! event publication.
//!
//! Navigation failures are signalled by a `false` return, never an error;
//! callers poll the result to decide whether to show feedback.

use crate::beans::BeanStore;
use crate::equipment::EquipmentCatalog;
use crate::events::{EventBus, SessionEvent, SubscriberId};
use crate::notes::{self, BrewingNote, NoteInput, SessionSnapshot};
use crate::param_info;
use crate::params;
use crate::recipes::{self, CatalogError, RecipeListEntry};
use crate::stages::expand;
use crate::storage::SessionStorage;
use crate::timer::{BrewTimer, TimerInput, TimerOutput};
use crate::types::{
    BrewStep, CoffeeBean, EditableParams, Equipment, MainTab, MethodType, ParameterInfo,
    PendingTransition, Recipe,
};
use anyhow::Result;
use log::{debug, info, warn};

/// Options for a single navigation call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigateOptions {
    /// Bypass the timer guard and prerequisite checks.
    pub force: bool,
    /// Restore the working recipe copy from the originally selected method.
    pub reset_params: bool,
    pub preserve_method: bool,
    pub preserve_equipment: bool,
    pub preserve_coffee_bean: bool,
}

/// Non-timer session state. Timer fields live in the timer machine and are
/// exposed through the controller's accessors.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub active_main_tab: MainTab,
    pub active_brewing_step: BrewStep,
    pub active_tab: String,
    pub method_type: MethodType,
    pub selected_coffee_bean: Option<String>,
    pub selected_bean_snapshot: Option<CoffeeBean>,
    pub selected_equipment: Option<String>,
    pub selected_method: Option<Recipe>,
    /// Working copy; diverges from `selected_method` through live edits.
    pub current_brewing_method: Option<Recipe>,
    pub editable_params: Option<EditableParams>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            active_main_tab: MainTab::Brewing,
            active_brewing_step: BrewStep::CoffeeBean,
            active_tab: BrewStep::CoffeeBean.tab_label().to_string(),
            method_type: MethodType::Common,
            selected_coffee_bean: None,
            selected_bean_snapshot: None,
            selected_equipment: None,
            selected_method: None,
            current_brewing_method: None,
            editable_params: None,
        }
    }
}

pub struct BrewingSessionController {
    state: SessionState,
    timer: BrewTimer,
    equipment: EquipmentCatalog,
    storage: SessionStorage,
    bean_store: Box<dyn BeanStore>,
    events: EventBus,
    pending: Option<PendingTransition>,
    deferred_nav: Option<(BrewStep, NavigateOptions)>,
}

impl BrewingSessionController {
    pub fn new(storage: SessionStorage, bean_store: Box<dyn BeanStore>) -> Self {
        let mut state = SessionState::default();
        // the one preference that outlives a session reset
        state.selected_equipment = storage.cached_equipment();
        if let Some(ref id) = state.selected_equipment {
            info!("Restored equipment preference: {}", id);
        }

        Self {
            state,
            timer: BrewTimer::new(),
            equipment: EquipmentCatalog::new(),
            storage,
            bean_store,
            events: EventBus::new(),
            pending: None,
            deferred_nav: None,
        }
    }

    // === OBSERVERS ===

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriberId
    where
        F: Fn(&SessionEvent) + 'static,
    {
        self.events.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.events.unsubscribe(id);
    }

    // === ACCESSORS ===

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn show_complete(&self) -> bool {
        self.timer.show_complete()
    }

    pub fn current_time(&self) -> u32 {
        self.timer.current_time()
    }

    pub fn current_stage(&self) -> usize {
        self.timer.current_stage()
    }

    pub fn countdown_time(&self) -> Option<u32> {
        self.timer.countdown_time()
    }

    pub fn expanded_stages(&self) -> &[crate::types::ExpandedStage] {
        self.timer.expanded()
    }

    pub fn parameter_info(&self) -> ParameterInfo {
        self.project_params()
    }

    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    pub fn equipment_catalog(&self) -> &EquipmentCatalog {
        &self.equipment
    }

    pub fn beans(&self) -> Vec<CoffeeBean> {
        self.bean_store.get_all()
    }

    pub fn set_custom_equipment(&mut self, custom: Vec<Equipment>) {
        self.equipment.set_custom(custom);
    }

    /// Merged recipe list for the currently selected equipment.
    pub fn method_list(&self) -> Vec<RecipeListEntry> {
        match self.state.selected_equipment {
            Some(ref id) => recipes::merged_view(&self.equipment, &self.storage, id),
            None => Vec::new(),
        }
    }

    // === NAVIGATION ===

    /// Drive any deferred navigation. Called by the UI loop (and by `tick`)
    /// after a main-tab switch has committed.
    pub fn pump(&mut self) {
        if let Some((target, options)) = self.deferred_nav.take() {
            debug!("Re-entering deferred navigation to {:?}", target);
            self.navigate_to_step(target, options);
        }
    }

    pub fn set_main_tab(&mut self, tab: MainTab) {
        if self.state.active_main_tab != tab {
            self.state.active_main_tab = tab;
            self.events.publish(SessionEvent::MainTabChanged { tab });
        }
    }

    /// Navigate the guided flow to `target`. Returns `false` when a guard
    /// rejects the navigation; rejection is expected control flow.
    pub fn navigate_to_step(&mut self, target: BrewStep, options: NavigateOptions) -> bool {
        // Main-tab guard: commit the tab switch first, then re-enter the
        // navigation on the next pump so it never acts on a half-switched UI.
        if self.state.active_main_tab != MainTab::Brewing {
            self.state.active_main_tab = MainTab::Brewing;
            self.deferred_nav = Some((target, options));
            self.events.publish(SessionEvent::MainTabChanged {
                tab: MainTab::Brewing,
            });
            debug!("Navigation to {:?} deferred until brewing tab commit", target);
            return false;
        }

        // Timer guard: no navigating away mid-pour.
        if self.timer.is_running() && !self.timer.show_complete() && !options.force {
            debug!("Navigation to {:?} rejected - timer running", target);
            return false;
        }

        let from = self.state.active_brewing_step;

        // Special-case table, checked before the generic prerequisite logic.
        match (from, target) {
            // Only a finished brew or a still-selected method can be
            // re-entered; a skip-to-notes without a recipe falls through to
            // the generic prerequisite check (and is rejected there).
            (BrewStep::Notes, BrewStep::Brewing)
                if self.timer.show_complete() || self.state.selected_method.is_some() =>
            {
                return self.notes_to_brewing()
            }
            (BrewStep::Brewing, BrewStep::Notes) if self.timer.show_complete() => {
                return self.finished_to_notes()
            }
            (BrewStep::Method, BrewStep::Notes) => return self.method_to_notes(),
            _ => {}
        }

        // A generic navigation invalidates any not-yet-consumed transient.
        self.pending = None;

        if !options.force && !self.prerequisites_met(target) {
            debug!("Navigation {:?} -> {:?} rejected - prerequisites unmet", from, target);
            return false;
        }

        if options.reset_params {
            self.restore_selected_method();
        }

        if target.index() < from.index() {
            self.apply_reset_policy(target, &options);
        }

        self.commit_step(from, target);
        true
    }

    /// Back from notes into the finished brew view. Selections survive, the
    /// timer stops with the final time preserved, and the next brewing-state
    /// reset is suppressed so it cannot undo this jump.
    fn notes_to_brewing(&mut self) -> bool {
        let from = self.state.active_brewing_step;
        self.timer.stop_for_review();
        self.set_step(BrewStep::Brewing);
        self.pending = Some(PendingTransition::FromNotesToBrewing);

        self.events.publish(SessionEvent::NoteFormClose);
        self.events.publish(SessionEvent::StepChanged {
            from,
            to: BrewStep::Brewing,
        });
        self.publish_params();
        true
    }

    /// Finishing a brew: enter the notes step and open the note form.
    fn finished_to_notes(&mut self) -> bool {
        let from = self.state.active_brewing_step;
        self.set_step(BrewStep::Notes);
        self.pending = Some(PendingTransition::NoteFormInProgress);

        self.events.publish(SessionEvent::NoteFormShow);
        self.events.publish(SessionEvent::StepChanged {
            from,
            to: BrewStep::Notes,
        });
        self.publish_params();
        true
    }

    /// The user skips recipe selection and journals anyway; the parameter bar
    /// shows equipment only.
    fn method_to_notes(&mut self) -> bool {
        let from = self.state.active_brewing_step;
        self.set_step(BrewStep::Notes);
        self.pending = Some(PendingTransition::SkippedMethodToNotes);

        self.events.publish(SessionEvent::NoteFormShow);
        self.events.publish(SessionEvent::StepChanged {
            from,
            to: BrewStep::Notes,
        });
        self.publish_params();
        true
    }

    fn prerequisites_met(&self, target: BrewStep) -> bool {
        match target {
            BrewStep::CoffeeBean | BrewStep::Method => true,
            BrewStep::Brewing => self.state.selected_method.is_some(),
            // reachable only through the special cases (or force)
            BrewStep::Notes => false,
        }
    }

    /// Clearing policy for backward navigation: the target step and explicit
    /// preserve flags whitelist state; timer fields always reset.
    fn apply_reset_policy(&mut self, target: BrewStep, options: &NavigateOptions) {
        let keep_bean = options.preserve_coffee_bean || target == BrewStep::Method;
        let keep_equipment = options.preserve_equipment || target == BrewStep::Method;
        let keep_method = options.preserve_method;

        if !keep_bean {
            self.state.selected_coffee_bean = None;
            self.state.selected_bean_snapshot = None;
        }
        if !keep_equipment {
            self.state.selected_equipment = None;
        }
        if !keep_method {
            self.clear_method();
        }
        self.timer.handle_input(TimerInput::Reset);
    }

    fn clear_method(&mut self) {
        self.state.selected_method = None;
        self.state.current_brewing_method = None;
        self.state.editable_params = None;
        self.timer.set_stages(Vec::new());
    }

    fn restore_selected_method(&mut self) {
        if let Some(method) = self.state.selected_method.clone() {
            self.state.editable_params = Some(EditableParams::from(&method.params));
            self.timer.set_stages(expand(&method.params.stages));
            self.state.current_brewing_method = Some(method);
        }
    }

    fn set_step(&mut self, step: BrewStep) {
        self.state.active_brewing_step = step;
        self.state.active_tab = step.tab_label().to_string();
    }

    fn commit_step(&mut self, from: BrewStep, to: BrewStep) {
        self.set_step(to);
        self.events.publish(SessionEvent::StepChanged { from, to });
        self.publish_params();
    }

    fn project_params(&self) -> ParameterInfo {
        // The method-skip jump shows equipment only, even when a selected
        // method survived a preserving navigation.
        let recipe = if self.pending == Some(PendingTransition::SkippedMethodToNotes) {
            None
        } else {
            self.state
                .current_brewing_method
                .as_ref()
                .or(self.state.selected_method.as_ref())
        };
        param_info::snapshot(
            self.state.active_brewing_step,
            self.state.selected_equipment.as_deref(),
            recipe,
            &self.equipment,
        )
    }

    /// Publication always reflects the state after the mutation that
    /// triggered it; it runs synchronously at the end of the mutating call.
    fn publish_params(&self) {
        self.events.publish(SessionEvent::ParamsUpdated {
            info: self.project_params(),
        });
    }

    // === RESET ===

    /// Reset brewing state. `preserve_method=false` is a hard reset back to
    /// the method step with the cached equipment rehydrated; `true` is a
    /// graduated soft reset that keeps as much of the session as still holds.
    pub fn reset_brewing_state(&mut self, preserve_method: bool) {
        // Consumed exactly once: a reset right after the notes -> brewing
        // jump must not undo it.
        if self.pending == Some(PendingTransition::FromNotesToBrewing) {
            self.pending = None;
            debug!("Reset skipped - notes->brewing jump in progress");
            return;
        }
        self.pending = None;

        let from = self.state.active_brewing_step;

        if !preserve_method {
            self.hard_reset(from);
            return;
        }

        self.timer.handle_input(TimerInput::Reset);

        if self.state.selected_method.is_some() {
            // a recipe is still selected: return to the brewing step
            self.restore_selected_method();
            self.commit_step(from, BrewStep::Brewing);
        } else if self.state.selected_equipment.is_some() {
            self.clear_method();
            self.commit_step(from, BrewStep::Method);
        } else if self.state.selected_coffee_bean.is_some() {
            self.clear_method();
            self.state.selected_equipment = None;
            self.commit_step(from, BrewStep::Method);
        } else {
            self.hard_reset(from);
        }
    }

    fn hard_reset(&mut self, from: BrewStep) {
        self.state.selected_coffee_bean = None;
        self.state.selected_bean_snapshot = None;
        self.clear_method();
        self.state.method_type = MethodType::Common;
        self.timer.handle_input(TimerInput::Reset);
        // rehydrate the cross-reload equipment preference
        self.state.selected_equipment = self.storage.cached_equipment();
        info!(
            "Hard reset, equipment {:?} restored from cache",
            self.state.selected_equipment
        );
        self.commit_step(from, BrewStep::Method);
    }

    // === SELECTION ===

    /// Select equipment by display name; unknown names keep the raw string as
    /// the id. Returns the resolved display name.
    pub fn handle_equipment_select(&mut self, name: &str) -> String {
        self.pump();
        if self.timer.show_complete() {
            self.reset_brewing_state(true);
        }
        self.pending = None;

        let id = self
            .equipment
            .resolve_id(name)
            .unwrap_or_else(|| name.to_string());

        self.clear_method();
        self.state.method_type = MethodType::Common;
        self.state.selected_equipment = Some(id.clone());
        self.storage.cache_equipment(&id);

        let from = self.state.active_brewing_step;
        self.events.publish(SessionEvent::EquipmentSelected { id: id.clone() });
        self.commit_step(from, BrewStep::Method);
        self.equipment.resolve_name(&id)
    }

    /// Coffee bean selection always funnels forward to the method step.
    pub fn handle_coffee_bean_select(&mut self, id: &str, snapshot: CoffeeBean) {
        self.pump();
        if self.timer.show_complete() {
            self.reset_brewing_state(true);
        }
        self.pending = None;

        self.state.selected_coffee_bean = Some(id.to_string());
        self.state.selected_bean_snapshot = Some(snapshot);

        let from = self.state.active_brewing_step;
        self.events
            .publish(SessionEvent::CoffeeBeanSelected { id: id.to_string() });
        self.commit_step(from, BrewStep::Method);
    }

    /// Select a recipe by provenance and position in that list, install it as
    /// the working method and advance to the brewing step.
    pub fn handle_method_select(&mut self, method_type: MethodType, index: usize) -> bool {
        self.pump();
        if self.timer.is_running() {
            debug!("Method select ignored - timer running");
            return false;
        }
        let Some(equipment_id) = self.state.selected_equipment.clone() else {
            warn!("Method select without equipment, ignoring");
            return false;
        };

        let list = match method_type {
            MethodType::Common => recipes::get_common(&self.equipment, &equipment_id),
            MethodType::Custom => recipes::get_custom(&self.storage, &equipment_id),
        };
        let Some(recipe) = list.get(index).cloned() else {
            warn!(
                "Method index {} out of range for {} ({:?})",
                index, equipment_id, method_type
            );
            return false;
        };

        self.state.method_type = method_type;
        self.state.editable_params = Some(EditableParams::from(&recipe.params));
        self.timer.set_stages(expand(&recipe.params.stages));
        self.state.selected_method = Some(recipe.clone());
        self.state.current_brewing_method = Some(recipe.clone());

        self.events.publish(SessionEvent::MethodSelected { name: recipe.name });
        self.navigate_to_step(BrewStep::Brewing, NavigateOptions::default())
    }

    // === PARAMETER EDITS ===

    /// Edit the coffee mass; water and stage waters are rederived. Invalid
    /// input and edits during a running timer are no-ops.
    pub fn edit_coffee(&mut self, value: &str) {
        self.derive_params(|params, recipe| {
            params::on_coffee_change(params::extract_number(value), params, recipe)
        });
    }

    /// Edit the brew ratio (`"1:<N>"` or a bare number).
    pub fn edit_ratio(&mut self, value: &str) {
        let ratio = if value.contains(':') {
            params::extract_ratio(value)
        } else {
            params::extract_number(value)
        };
        self.derive_params(|params, recipe| params::on_ratio_change(ratio, params, recipe));
    }

    pub fn edit_grind_size(&mut self, value: &str) {
        self.derive_params(|params, recipe| Some(params::on_grind_size_change(value, params, recipe)));
    }

    pub fn edit_temp(&mut self, value: &str) {
        self.derive_params(|params, recipe| Some(params::on_temp_change(value, params, recipe)));
    }

    fn derive_params<F>(&mut self, derive: F)
    where
        F: FnOnce(&EditableParams, &Recipe) -> Option<(EditableParams, Recipe)>,
    {
        if self.timer.is_running() {
            debug!("Parameter edit ignored - timer running");
            return;
        }
        let (Some(params), Some(recipe)) = (
            self.state.editable_params.as_ref(),
            self.state.current_brewing_method.as_ref(),
        ) else {
            debug!("Parameter edit without a working method, ignoring");
            return;
        };

        let Some((new_params, new_recipe)) = derive(params, recipe) else {
            debug!("Parameter edit was a no-op");
            return;
        };

        self.timer.set_stages(expand(&new_recipe.params.stages));
        self.state.editable_params = Some(new_params);
        self.state.current_brewing_method = Some(new_recipe);
        self.publish_params();
    }

    // === TIMER ===

    pub fn start_brew_timer(&mut self) -> bool {
        if self.state.current_brewing_method.is_none() {
            debug!("Timer start without a method, ignoring");
            return false;
        }
        let outputs = self.timer.handle_input(TimerInput::Start);
        let started = !outputs.is_empty();
        self.forward_timer_outputs(outputs);
        started
    }

    pub fn pause_brew_timer(&mut self) {
        let outputs = self.timer.handle_input(TimerInput::Pause);
        self.forward_timer_outputs(outputs);
    }

    pub fn resume_brew_timer(&mut self) {
        let outputs = self.timer.handle_input(TimerInput::Resume);
        self.forward_timer_outputs(outputs);
    }

    pub fn reset_brew_timer(&mut self) {
        let outputs = self.timer.handle_input(TimerInput::Reset);
        self.forward_timer_outputs(outputs);
    }

    /// One-second tick from the UI loop; also drives deferred navigation.
    pub fn tick(&mut self) {
        self.pump();
        let outputs = self.timer.handle_input(TimerInput::Tick);
        self.forward_timer_outputs(outputs);
    }

    fn forward_timer_outputs(&mut self, outputs: heapless::Vec<TimerOutput, 8>) {
        for output in outputs {
            let event = match output {
                TimerOutput::CountdownStarted { seconds } => {
                    Some(SessionEvent::CountdownTick { remaining: seconds })
                }
                TimerOutput::CountdownTick { remaining } => {
                    Some(SessionEvent::CountdownTick { remaining })
                }
                TimerOutput::TimingStarted => Some(SessionEvent::TimerStarted),
                TimerOutput::Paused => Some(SessionEvent::TimerPaused),
                TimerOutput::Resumed => Some(SessionEvent::TimerResumed),
                TimerOutput::StageAdvanced { from, to } => {
                    Some(SessionEvent::StageAdvanced { from, to })
                }
                TimerOutput::Finished { total_time } => Some(SessionEvent::BrewFinished {
                    total_time_s: total_time,
                }),
                TimerOutput::Reset => None,
            };
            if let Some(event) = event {
                self.events.publish(event);
            }
        }
    }

    // === NOTES ===

    /// Persist the brewing note, request the bean deduction, switch the UI to
    /// the journal and hard-reset the brewing state.
    pub fn save_brewing_note(&mut self, input: NoteInput) -> Result<BrewingNote> {
        let method = self
            .state
            .current_brewing_method
            .as_ref()
            .or(self.state.selected_method.as_ref());

        let snapshot = SessionSnapshot {
            equipment: self
                .state
                .selected_equipment
                .as_deref()
                .map(|id| self.equipment.resolve_name(id)),
            method: method.map(|m| m.name.clone()),
            params: self.state.editable_params.clone(),
            stages: method.map(|m| m.params.stages.clone()).unwrap_or_default(),
            coffee_bean: self.state.selected_bean_snapshot.clone(),
            total_time_s: self.timer.current_time(),
        };

        let note = notes::compose_and_save(
            &mut self.storage,
            self.bean_store.as_mut(),
            snapshot,
            input,
        )?;

        self.events.publish(SessionEvent::NoteSaved { id: note.id.clone() });
        self.events.publish(SessionEvent::NoteFormClose);
        self.set_main_tab(MainTab::Notes);

        self.pending = None;
        self.reset_brewing_state(false);
        Ok(note)
    }

    pub fn saved_notes(&self) -> Vec<BrewingNote> {
        notes::load_all(&self.storage)
    }

    // === CUSTOM RECIPES ===

    /// Save a user-authored recipe for an equipment. Validation failures
    /// surface as errors, unlike navigation rejections.
    pub fn save_custom_method(
        &mut self,
        recipe: Recipe,
        equipment_id: &str,
        existing: Option<&Recipe>,
    ) -> Result<Recipe, CatalogError> {
        recipes::save(&mut self.storage, recipe, equipment_id, existing)
    }

    pub fn delete_custom_method(
        &mut self,
        recipe: &Recipe,
        equipment_id: &str,
    ) -> Result<(), CatalogError> {
        recipes::delete(&mut self.storage, recipe, equipment_id)
    }
}
