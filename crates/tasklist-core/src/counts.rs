use std::collections::BTreeMap;

use crate::filter::{CategoryFilter, StatusFilter};
use crate::task::{Category, Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub all: usize,
    pub active: usize,
    pub completed: usize,
}

impl StatusCounts {
    pub fn get(&self, status: StatusFilter) -> usize {
        match status {
            StatusFilter::All => self.all,
            StatusFilter::Active => self.active,
            StatusFilter::Completed => self.completed,
        }
    }
}

/// Tallies over the whole collection, independent of the current filter.
///
/// `category` only holds entries for categories that occur, plus the
/// `CategoryFilter::All` total. Use [`Counts::category`] to read a missing
/// entry as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counts {
    pub status: StatusCounts,
    pub by_category: BTreeMap<CategoryFilter, usize>,
}

impl Counts {
    pub fn tally(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|task| task.completed).count();
        let status = StatusCounts {
            all: tasks.len(),
            active: tasks.len() - completed,
            completed,
        };

        let mut by_category = BTreeMap::new();
        by_category.insert(CategoryFilter::All, tasks.len());
        for task in tasks {
            *by_category
                .entry(CategoryFilter::Only(task.category))
                .or_insert(0_usize) += 1;
        }

        Self {
            status,
            by_category,
        }
    }

    pub fn category(&self, filter: impl Into<CategoryFilter>) -> usize {
        self.by_category
            .get(&filter.into())
            .copied()
            .unwrap_or(0)
    }

    /// Every category in display order, zeros included.
    pub fn per_category(&self) -> Vec<(Category, usize)> {
        Category::ALL
            .into_iter()
            .map(|category| (category, self.category(category)))
            .collect()
    }
}
