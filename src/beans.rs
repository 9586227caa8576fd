//! Coffee bean inventory boundary. The core never mutates beans in place;
//! deduction after a finished brew goes through this interface.

use crate::types::CoffeeBean;
use log::{debug, warn};

pub trait BeanStore {
    fn get_all(&self) -> Vec<CoffeeBean>;

    /// Apply a delta (negative for deduction) to a bean's remaining mass.
    /// Returns the updated bean, or `None` if the id is unknown.
    fn update_remaining(&mut self, id: &str, delta_grams: f64) -> Option<CoffeeBean>;
}

/// In-memory bean inventory for tests and standalone use.
#[derive(Debug, Default)]
pub struct MemoryBeanStore {
    beans: Vec<CoffeeBean>,
}

impl MemoryBeanStore {
    pub fn new(beans: Vec<CoffeeBean>) -> Self {
        Self { beans }
    }
}

impl BeanStore for MemoryBeanStore {
    fn get_all(&self) -> Vec<CoffeeBean> {
        self.beans.clone()
    }

    fn update_remaining(&mut self, id: &str, delta_grams: f64) -> Option<CoffeeBean> {
        match self.beans.iter_mut().find(|b| b.id == id) {
            Some(bean) => {
                let before = bean.remaining_g;
                bean.remaining_g = (bean.remaining_g + delta_grams).max(0.0);
                debug!(
                    "Bean {}: remaining {:.1}g -> {:.1}g",
                    id, before, bean.remaining_g
                );
                Some(bean.clone())
            }
            None => {
                warn!("Bean {} not found, remaining unchanged", id);
                None
            }
        }
    }
}
