use anyhow::anyhow;
use chrono::{
  DateTime,
  Utc
};
use tracing::{
  debug,
  info,
  instrument,
  warn
};

use crate::cli::{
  AddArgs,
  Command,
  EditArgs,
  ListArgs
};
use crate::config::Config;
use crate::filter::FilterPatch;
use crate::notify::{
  NotificationKind,
  Notifier
};
use crate::render::{
  Renderer,
  short_id
};
use crate::store::{
  Outcome,
  TaskStore
};
use crate::task::{
  Task,
  TaskId,
  TaskPatch,
  encode_tasks_pretty
};

#[instrument(skip(
  store, cfg, renderer, notices,
  command, now
))]
pub fn dispatch(
  store: &mut TaskStore,
  cfg: &Config,
  renderer: &Renderer,
  notices: &dyn Notifier,
  command: Command,
  now: DateTime<Utc>
) -> anyhow::Result<()> {
  debug!(?command, "dispatching");

  match command {
    | Command::Add(args) => {
      cmd_add(store, cfg, notices, args)
    }
    | Command::List(args) => {
      cmd_list(store, renderer, args, now)
    }
    | Command::Toggle {
      id
    } => cmd_toggle(store, notices, &id),
    | Command::Edit(args) => {
      cmd_edit(store, notices, args)
    }
    | Command::Delete {
      id
    } => cmd_delete(store, notices, &id),
    | Command::Show {
      id
    } => cmd_show(store, renderer, &id),
    | Command::Counts => {
      renderer.print_counts(&store.counts())
    }
    | Command::Export => {
      println!(
        "{}",
        encode_tasks_pretty(store.tasks())?
      );
      Ok(())
    }
  }
}

/// Maps a full id or a unique id
/// prefix onto a task id. Input that
/// matches nothing is returned as-is so
/// the store treats it as unknown.
pub fn resolve_id(
  tasks: &[Task],
  raw: &str
) -> anyhow::Result<TaskId> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Err(anyhow!(
      "task id cannot be empty"
    ));
  }

  if let Some(task) = tasks
    .iter()
    .find(|task| task.id.as_str() == raw)
  {
    return Ok(task.id.clone());
  }

  let matches: Vec<&Task> = tasks
    .iter()
    .filter(|task| {
      task.id.as_str().starts_with(raw)
    })
    .collect();

  match matches.as_slice() {
    | [] => Ok(TaskId::new(raw)),
    | [single] => Ok(single.id.clone()),
    | many => Err(anyhow!(
      "id prefix {raw:?} is ambiguous: \
       {} tasks match",
      many.len()
    ))
  }
}

fn cmd_add(
  store: &mut TaskStore,
  cfg: &Config,
  notices: &dyn Notifier,
  args: AddArgs
) -> anyhow::Result<()> {
  info!("command add");

  let category = match args.category {
    | Some(category) => category,
    | None => cfg.default_category()?
  };
  let title = args.title.join(" ");

  match store.add(
    &title,
    args.description.as_deref(),
    category
  )? {
    | Some(id) => confirm(
      notices,
      &format!(
        "Created task {}.",
        short_id(id.as_str())
      )
    ),
    | None => report(
      notices,
      "Task title cannot be empty"
    )
  }
  Ok(())
}

fn cmd_list(
  store: &mut TaskStore,
  renderer: &Renderer,
  args: ListArgs,
  now: DateTime<Utc>
) -> anyhow::Result<()> {
  info!("command list");

  store.set_filter(FilterPatch {
    status:   args.status,
    category: args.category
  });
  let filter = store.filter();
  renderer.print_task_table(
    &store.derived_view(),
    &filter,
    now
  )
}

fn cmd_toggle(
  store: &mut TaskStore,
  notices: &dyn Notifier,
  raw_id: &str
) -> anyhow::Result<()> {
  info!("command toggle");

  let id =
    resolve_id(store.tasks(), raw_id)?;
  match store.toggle(&id)? {
    | Outcome::Applied => {
      let state = store
        .get(&id)
        .map(|task| {
          if task.completed {
            "completed"
          } else {
            "active"
          }
        })
        .unwrap_or("changed");
      confirm(
        notices,
        &format!(
          "Task {} is now {state}.",
          short_id(id.as_str())
        )
      );
    }
    | Outcome::Unchanged => {
      report_missing(notices, &id)
    }
  }
  Ok(())
}

fn cmd_edit(
  store: &mut TaskStore,
  notices: &dyn Notifier,
  args: EditArgs
) -> anyhow::Result<()> {
  info!("command edit");

  let id =
    resolve_id(store.tasks(), &args.id)?;

  let mut patch = TaskPatch::default();
  if let Some(title) = &args.title {
    let title = title.trim();
    if title.is_empty() {
      report(
        notices,
        "Task title cannot be empty"
      );
      return Ok(());
    }
    patch = patch.title(title);
  }
  if let Some(description) =
    &args.description
  {
    let description = description.trim();
    patch = if description.is_empty() {
      patch.clear_description()
    } else {
      patch.description(description)
    };
  }
  if args.clear_description {
    patch = patch.clear_description();
  }
  if let Some(category) = args.category {
    patch = patch.category(category);
  }
  if let Some(completed) = args.completed
  {
    patch = patch.completed(completed);
  }

  if patch.is_empty() {
    return Err(anyhow!(
      "nothing to change: pass --title, \
       --description, \
       --clear-description, --category \
       or --completed"
    ));
  }

  if store.edit(&id, patch)?
    == Outcome::Unchanged
  {
    report_missing(notices, &id);
  }
  Ok(())
}

fn cmd_delete(
  store: &mut TaskStore,
  notices: &dyn Notifier,
  raw_id: &str
) -> anyhow::Result<()> {
  info!("command delete");

  let id =
    resolve_id(store.tasks(), raw_id)?;
  if store.delete(&id)?
    == Outcome::Unchanged
  {
    report_missing(notices, &id);
  }
  Ok(())
}

fn cmd_show(
  store: &TaskStore,
  renderer: &Renderer,
  raw_id: &str
) -> anyhow::Result<()> {
  info!("command show");

  let id =
    resolve_id(store.tasks(), raw_id)?;
  let task =
    store.get(&id).ok_or_else(|| {
      anyhow!("no task matches id {id}")
    })?;
  renderer.print_task_info(task)
}

fn report_missing(
  notices: &dyn Notifier,
  id: &TaskId
) {
  warn!(id = %id, "no task matches id");
  report(
    notices,
    &format!("No task matches id {id}")
  );
}

fn confirm(
  notices: &dyn Notifier,
  message: &str
) {
  notice(
    notices,
    message,
    NotificationKind::Success
  );
}

fn report(
  notices: &dyn Notifier,
  message: &str
) {
  notice(
    notices,
    message,
    NotificationKind::Error
  );
}

fn notice(
  notices: &dyn Notifier,
  message: &str,
  kind: NotificationKind
) {
  if let Err(err) =
    notices.notify(message, kind)
  {
    warn!(error = %err, "failed to show notice");
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::{
    dispatch,
    resolve_id
  };
  use crate::cli::{
    AddArgs,
    Command,
    EditArgs
  };
  use crate::config::Config;
  use crate::datetime::DisplayZone;
  use crate::notify::{
    NotificationKind,
    RecordingNotifier
  };
  use crate::render::Renderer;
  use crate::services::SequentialIds;
  use crate::storage::MemoryStorage;
  use crate::store::TaskStore;
  use crate::task::{
    Category,
    Task,
    TaskId
  };

  fn task(id: &str) -> Task {
    Task::new(
      TaskId::new(id),
      id.to_string(),
      None,
      Category::Other,
      Utc::now()
    )
  }

  fn harness()
  -> (TaskStore, Renderer, RecordingNotifier)
  {
    let store =
      TaskStore::open(MemoryStorage::new())
        .with_id_generator(
          SequentialIds::new("t")
        );
    let renderer = Renderer::plain(
      DisplayZone::resolve(Some("UTC"))
        .expect("utc")
    );
    (
      store,
      renderer,
      RecordingNotifier::new()
    )
  }

  fn edit_args(id: &str) -> EditArgs {
    EditArgs {
      id:                id.to_string(),
      title:             None,
      description:       None,
      clear_description: false,
      category:          None,
      completed:         None
    }
  }

  #[test]
  fn resolves_exact_and_prefix_ids() {
    let tasks = vec![
      task("abc-1"),
      task("abd-2"),
      task("abc")
    ];

    assert_eq!(
      resolve_id(&tasks, "abc")
        .expect("exact")
        .as_str(),
      "abc"
    );
    assert_eq!(
      resolve_id(&tasks, "abd")
        .expect("prefix")
        .as_str(),
      "abd-2"
    );
    assert!(
      resolve_id(&tasks, "ab").is_err()
    );
    assert_eq!(
      resolve_id(&tasks, "zzz")
        .expect("unknown")
        .as_str(),
      "zzz"
    );
    assert!(
      resolve_id(&tasks, "  ").is_err()
    );
  }

  #[test]
  fn add_uses_configured_category() {
    let (mut store, renderer, notices) =
      harness();
    let mut cfg = Config::defaults();
    cfg.apply_overrides(vec![(
      "default.category".to_string(),
      "work".to_string()
    )]);

    dispatch(
      &mut store,
      &cfg,
      &renderer,
      &notices,
      Command::Add(AddArgs {
        title:       vec![
          "Draft".to_string(),
          "report".to_string(),
        ],
        description: None,
        category:    None
      }),
      Utc::now()
    )
    .expect("add");

    assert_eq!(store.tasks().len(), 1);
    assert_eq!(
      store.tasks()[0].title,
      "Draft report"
    );
    assert_eq!(
      store.tasks()[0].category,
      Category::Work
    );
  }

  #[test]
  fn blank_add_reports_error_notice() {
    let (mut store, renderer, notices) =
      harness();

    dispatch(
      &mut store,
      &Config::defaults(),
      &renderer,
      &notices,
      Command::Add(AddArgs {
        title:       vec!["  ".to_string()],
        description: None,
        category:    None
      }),
      Utc::now()
    )
    .expect("blank add is not an error");

    assert!(store.tasks().is_empty());
    let seen = notices.notifications();
    assert_eq!(seen.len(), 1);
    assert_eq!(
      seen[0].kind,
      NotificationKind::Error
    );
  }

  #[test]
  fn edit_validates_title_before_store() {
    let (mut store, renderer, notices) =
      harness();
    let id = store
      .add("Walk", None, Category::Health)
      .expect("add")
      .expect("id");

    let mut args = edit_args(id.as_str());
    args.title = Some("   ".to_string());
    dispatch(
      &mut store,
      &Config::defaults(),
      &renderer,
      &notices,
      Command::Edit(args),
      Utc::now()
    )
    .expect("edit");
    assert_eq!(
      store.tasks()[0].title,
      "Walk"
    );

    let mut args = edit_args("t");
    args.title =
      Some("  Walk the dog ".to_string());
    args.description =
      Some("   ".to_string());
    dispatch(
      &mut store,
      &Config::defaults(),
      &renderer,
      &notices,
      Command::Edit(args),
      Utc::now()
    )
    .expect("edit by prefix");
    assert_eq!(
      store.tasks()[0].title,
      "Walk the dog"
    );
    assert_eq!(
      store.tasks()[0].description,
      None
    );
  }

  #[test]
  fn edit_without_fields_is_an_error() {
    let (mut store, renderer, notices) =
      harness();
    store
      .add("Walk", None, Category::Health)
      .expect("add");

    assert!(
      dispatch(
        &mut store,
        &Config::defaults(),
        &renderer,
        &notices,
        Command::Edit(edit_args("t-1")),
        Utc::now()
      )
      .is_err()
    );
  }

  #[test]
  fn unknown_ids_report_and_leave_tasks() {
    let (mut store, renderer, notices) =
      harness();
    store
      .add("Walk", None, Category::Health)
      .expect("add");
    let before = store.tasks().to_vec();

    dispatch(
      &mut store,
      &Config::defaults(),
      &renderer,
      &notices,
      Command::Delete {
        id: "missing".to_string()
      },
      Utc::now()
    )
    .expect("delete unknown");

    assert_eq!(store.tasks(), before);
    assert_eq!(
      notices.messages(),
      vec![
        "No task matches id missing"
          .to_string()
      ]
    );
  }

  #[test]
  fn confirmations_go_through_notifier() {
    let (mut store, renderer, notices) =
      harness();

    dispatch(
      &mut store,
      &Config::defaults(),
      &renderer,
      &notices,
      Command::Add(AddArgs {
        title:       vec!["Stretch".to_string()],
        description: None,
        category:    None
      }),
      Utc::now()
    )
    .expect("add");
    dispatch(
      &mut store,
      &Config::defaults(),
      &renderer,
      &notices,
      Command::Toggle {
        id: "t-1".to_string()
      },
      Utc::now()
    )
    .expect("toggle");

    let seen = notices.notifications();
    assert_eq!(
      notices.messages(),
      vec![
        "Created task t-1.".to_string(),
        "Task t-1 is now completed."
          .to_string()
      ]
    );
    assert!(seen.iter().all(|notice| {
      notice.kind
        == NotificationKind::Success
    }));
  }
}
