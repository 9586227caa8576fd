use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MainTab {
    Brewing,
    Notes,
    Beans,
}

/// Steps of the guided brewing flow, in nominal forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrewStep {
    CoffeeBean,
    Method,
    Brewing,
    Notes,
}

impl BrewStep {
    /// Position in the nominal flow, used to tell forward from backward navigation.
    pub fn index(&self) -> usize {
        match self {
            BrewStep::CoffeeBean => 0,
            BrewStep::Method => 1,
            BrewStep::Brewing => 2,
            BrewStep::Notes => 3,
        }
    }

    /// Display label shown on the step tab bar.
    pub fn tab_label(&self) -> &'static str {
        match self {
            BrewStep::CoffeeBean => "咖啡豆",
            BrewStep::Method => "方案",
            BrewStep::Brewing => "注水",
            BrewStep::Notes => "记录",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodType {
    Common,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationType {
    V60,
    Kalita,
    Origami,
    Clever,
    Custom,
    Espresso,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValveStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_custom: bool,
    pub animation_type: AnimationType,
    pub has_valve: bool,
}

/// One coarse pour instruction of a recipe. `time` is cumulative seconds from
/// brew start; stage times are strictly increasing within a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub time: u32,
    pub label: String,
    pub water: String,
    pub detail: String,
    /// Pour duration in seconds. `None` means "unset" and defaults to a third
    /// of the interval at expansion time; `Some(0)` means explicitly
    /// instantaneous and always expands to a pure wait.
    pub pour_time: Option<u32>,
    pub pour_type: String,
    pub valve_status: Option<ValveStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrewingParams {
    pub coffee: String,
    pub water: String,
    pub ratio: String,
    pub grind_size: String,
    pub temp: String,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Option<String>,
    pub name: String,
    pub params: BrewingParams,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpandedStageKind {
    Pour,
    Wait,
}

/// Fine-grained timer stage derived from a coarse `Stage`. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandedStage {
    pub kind: ExpandedStageKind,
    pub label: String,
    pub water: String,
    pub detail: String,
    pub start_time: u32,
    pub end_time: u32,
    pub pour_type: String,
    pub valve_status: Option<ValveStatus>,
    pub original_index: usize,
}

/// Scalar brewing parameters as the user edits them. Kept in sync with the
/// working recipe's params by the parameter-derivation functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableParams {
    pub coffee: String,
    pub water: String,
    pub ratio: String,
    pub grind_size: String,
    pub temp: String,
}

impl From<&BrewingParams> for EditableParams {
    fn from(params: &BrewingParams) -> Self {
        Self {
            coffee: params.coffee.clone(),
            water: params.water.clone(),
            ratio: params.ratio.clone(),
            grind_size: params.grind_size.clone(),
            temp: params.temp.clone(),
        }
    }
}

/// Display-only snapshot for the parameter bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub equipment: Option<String>,
    pub method: Option<String>,
    pub params: Option<EditableParams>,
}

impl ParameterInfo {
    pub fn empty() -> Self {
        Self {
            equipment: None,
            method: None,
            params: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoffeeBean {
    pub id: String,
    pub name: String,
    pub capacity_g: f64,
    pub remaining_g: f64,
}

/// Typed replacement for the source app's string-keyed transient flags.
/// Set by one transition, consumed exactly once by its counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingTransition {
    /// Set by the notes -> brewing back-jump; makes the next brewing-state
    /// reset a no-op so it cannot undo the jump.
    FromNotesToBrewing,
    /// A note form was opened from a finished brew.
    NoteFormInProgress,
    /// The user skipped recipe selection and went straight to journaling.
    SkippedMethodToNotes,
}

pub const COUNTDOWN_SECONDS: u32 = 3;
pub const DEFAULT_POUR_TIME_DIVISOR: u32 = 3;
pub const WAITING_LABEL: &str = "等待";
