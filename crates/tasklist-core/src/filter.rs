use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

use crate::task::{
  Category,
  Task
};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum StatusFilter {
  #[default]
  All,
  Active,
  Completed
}

impl StatusFilter {
  pub const ALL: [StatusFilter; 3] = [
    StatusFilter::All,
    StatusFilter::Active,
    StatusFilter::Completed
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | StatusFilter::All => "all",
      | StatusFilter::Active => "active",
      | StatusFilter::Completed => {
        "completed"
      }
    }
  }

  fn admits(
    self,
    completed: bool
  ) -> bool {
    match self {
      | StatusFilter::All => true,
      | StatusFilter::Active => {
        !completed
      }
      | StatusFilter::Completed => {
        completed
      }
    }
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let wanted =
      s.trim().to_ascii_lowercase();
    StatusFilter::ALL
      .into_iter()
      .find(|status| {
        status.as_str() == wanted
      })
      .ok_or_else(|| {
        anyhow!(
          "unknown status filter {s:?} \
           (expected all, active or \
           completed)"
        )
      })
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub enum CategoryFilter {
  #[default]
  All,
  Only(Category)
}

impl CategoryFilter {
  pub fn as_str(self) -> &'static str {
    match self {
      | CategoryFilter::All => "all",
      | CategoryFilter::Only(
        category
      ) => category.as_str()
    }
  }

  fn admits(
    self,
    category: Category
  ) -> bool {
    match self {
      | CategoryFilter::All => true,
      | CategoryFilter::Only(
        wanted
      ) => wanted == category
    }
  }
}

impl From<Category> for CategoryFilter {
  fn from(category: Category) -> Self {
    CategoryFilter::Only(category)
  }
}

impl fmt::Display for CategoryFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for CategoryFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim()
      .eq_ignore_ascii_case("all")
    {
      return Ok(CategoryFilter::All);
    }
    s.parse::<Category>()
      .map(CategoryFilter::Only)
  }
}

/// Current selection of the list view.
/// Never persisted.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub struct FilterState {
  pub status:   StatusFilter,
  pub category: CategoryFilter
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub struct FilterPatch {
  pub status:   Option<StatusFilter>,
  pub category: Option<CategoryFilter>
}

impl FilterPatch {
  pub fn status(
    mut self,
    status: StatusFilter
  ) -> Self {
    self.status = Some(status);
    self
  }

  pub fn category(
    mut self,
    category: impl Into<CategoryFilter>
  ) -> Self {
    self.category =
      Some(category.into());
    self
  }
}

impl FilterState {
  pub fn merge(
    &mut self,
    patch: FilterPatch
  ) {
    if let Some(status) = patch.status {
      self.status = status;
    }
    if let Some(category) =
      patch.category
    {
      self.category = category;
    }
  }

  pub fn is_default(&self) -> bool {
    *self == Self::default()
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    self.status.admits(task.completed)
      && self
        .category
        .admits(task.category)
  }
}
