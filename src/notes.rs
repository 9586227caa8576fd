//! Brewing-note journaling: assembles a note from the finished session,
//! persists the whole collection most-recent-first and requests the bean
//! inventory deduction.

use crate::beans::BeanStore;
use crate::params::extract_number;
use crate::storage::{SessionStorage, KEY_NOTES};
use crate::types::{CoffeeBean, EditableParams, Stage};
use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasteRatings {
    pub acidity: u8,
    pub sweetness: u8,
    pub bitterness: u8,
    pub body: u8,
}

/// Free-text and rating fields supplied by the user in the note form.
#[derive(Debug, Clone, Default)]
pub struct NoteInput {
    pub rating: u8,
    pub taste: TasteRatings,
    pub notes: String,
}

/// Snapshot of the session at completion, as seen by the note composer.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub equipment: Option<String>,
    pub method: Option<String>,
    pub params: Option<EditableParams>,
    pub stages: Vec<Stage>,
    pub coffee_bean: Option<CoffeeBean>,
    pub total_time_s: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrewingNote {
    pub id: String,
    pub timestamp: i64,
    pub equipment: Option<String>,
    pub method: Option<String>,
    pub params: Option<EditableParams>,
    pub stages: Vec<Stage>,
    pub rating: u8,
    pub taste: TasteRatings,
    pub notes: String,
    pub coffee_bean: Option<CoffeeBean>,
    pub total_time_s: u32,
}

/// Assemble and persist a brewing note, then request the bean deduction.
///
/// The notes collection is read and rewritten whole, most-recent-first. The
/// deduction is best-effort: a parse failure, non-positive amount or store
/// miss is logged and never blocks the already-saved note.
pub fn compose_and_save(
    storage: &mut SessionStorage,
    bean_store: &mut dyn BeanStore,
    snapshot: SessionSnapshot,
    input: NoteInput,
) -> Result<BrewingNote> {
    let note = BrewingNote {
        id: Uuid::new_v4().to_string(),
        timestamp: Utc::now().timestamp_millis(),
        equipment: snapshot.equipment,
        method: snapshot.method,
        params: snapshot.params.clone(),
        stages: snapshot.stages,
        rating: input.rating,
        taste: input.taste,
        notes: input.notes,
        coffee_bean: snapshot.coffee_bean.clone(),
        total_time_s: snapshot.total_time_s,
    };

    let mut all: Vec<BrewingNote> = storage.load_json(KEY_NOTES);
    all.insert(0, note.clone());
    storage.save_json(KEY_NOTES, &all)?;
    info!("📝 Saved brewing note {} ({} total)", note.id, all.len());

    deduct_bean(bean_store, snapshot.coffee_bean.as_ref(), snapshot.params.as_ref());

    Ok(note)
}

pub fn load_all(storage: &SessionStorage) -> Vec<BrewingNote> {
    storage.load_json(KEY_NOTES)
}

fn deduct_bean(bean_store: &mut dyn BeanStore, bean: Option<&CoffeeBean>, params: Option<&EditableParams>) {
    let (Some(bean), Some(params)) = (bean, params) else {
        debug!("No bean or params selected, skipping deduction");
        return;
    };

    let amount = extract_number(&params.coffee);
    if amount <= 0.0 {
        debug!("Coffee amount {:?} not deductible, skipping", params.coffee);
        return;
    }

    match bean_store.update_remaining(&bean.id, -amount) {
        Some(updated) => info!(
            "☕ Deducted {:.1}g from {}, {:.1}g remaining",
            amount, updated.name, updated.remaining_g
        ),
        None => warn!("Bean deduction failed for {}, note kept anyway", bean.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beans::MemoryBeanStore;

    fn bean(remaining: f64) -> CoffeeBean {
        CoffeeBean {
            id: "b1".to_string(),
            name: "耶加雪菲".to_string(),
            capacity_g: 250.0,
            remaining_g: remaining,
        }
    }

    fn params(coffee: &str) -> EditableParams {
        EditableParams {
            coffee: coffee.to_string(),
            water: "225g".to_string(),
            ratio: "1:15".to_string(),
            grind_size: "中细".to_string(),
            temp: "92°C".to_string(),
        }
    }

    fn snapshot(coffee: &str, with_bean: bool) -> SessionSnapshot {
        SessionSnapshot {
            equipment: Some("V60".to_string()),
            method: Some("三段式".to_string()),
            params: Some(params(coffee)),
            stages: Vec::new(),
            coffee_bean: with_bean.then(|| bean(100.0)),
            total_time_s: 145,
        }
    }

    #[test]
    fn test_note_prepended_most_recent_first() {
        let mut storage = SessionStorage::in_memory();
        let mut beans = MemoryBeanStore::new(vec![bean(100.0)]);

        let first =
            compose_and_save(&mut storage, &mut beans, snapshot("15g", true), NoteInput::default())
                .unwrap();
        let second =
            compose_and_save(&mut storage, &mut beans, snapshot("15g", true), NoteInput::default())
                .unwrap();

        let all = load_all(&storage);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[test]
    fn test_bean_deduction_on_save() {
        let mut storage = SessionStorage::in_memory();
        let mut beans = MemoryBeanStore::new(vec![bean(100.0)]);

        compose_and_save(&mut storage, &mut beans, snapshot("15g", true), NoteInput::default())
            .unwrap();
        assert_eq!(beans.get_all()[0].remaining_g, 85.0);
    }

    #[test]
    fn test_unparsable_coffee_skips_deduction() {
        let mut storage = SessionStorage::in_memory();
        let mut beans = MemoryBeanStore::new(vec![bean(100.0)]);

        compose_and_save(&mut storage, &mut beans, snapshot("适量", true), NoteInput::default())
            .unwrap();
        assert_eq!(beans.get_all()[0].remaining_g, 100.0);
        assert_eq!(load_all(&storage).len(), 1);
    }

    #[test]
    fn test_missing_bean_still_saves_note() {
        let mut storage = SessionStorage::in_memory();
        let mut beans = MemoryBeanStore::new(Vec::new());

        let note =
            compose_and_save(&mut storage, &mut beans, snapshot("15g", true), NoteInput::default())
                .unwrap();
        assert_eq!(load_all(&storage)[0].id, note.id);
    }

    #[test]
    fn test_no_bean_selected_skips_deduction() {
        let mut storage = SessionStorage::in_memory();
        let mut beans = MemoryBeanStore::new(vec![bean(100.0)]);

        compose_and_save(&mut storage, &mut beans, snapshot("15g", false), NoteInput::default())
            .unwrap();
        assert_eq!(beans.get_all()[0].remaining_g, 100.0);
    }
}
