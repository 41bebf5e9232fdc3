use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::datetime::DisplayZone;
use crate::store::DEFAULT_STORAGE_KEY;
use crate::task::Category;

const CONFIG_ENV_VAR: &str = "TODORC";
const CONFIG_FILE_NAME: &str =
  ".todorc";
const DEFAULT_DATA_DIR: &str =
  "~/.tasklist";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  pub fn defaults() -> Self {
    let mut cfg = Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    };

    cfg.map.insert(
      "data.location".to_string(),
      DEFAULT_DATA_DIR.to_string()
    );
    cfg.map.insert(
      "storage.key".to_string(),
      DEFAULT_STORAGE_KEY.to_string()
    );
    cfg.map.insert(
      "color".to_string(),
      "on".to_string()
    );
    cfg.map.insert(
      "default.category".to_string(),
      Category::default()
        .as_str()
        .to_string()
    );
    cfg.map.insert(
      "display.timezone".to_string(),
      "local".to_string()
    );
    cfg
  }

  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::defaults();

    let rc =
      resolve_config_path(config_override)?;
    if let Some(path) = rc {
      info!(config = %path.display(), "loading config");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no config file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| {
        parse_bool(v).ok_or_else(|| {
          anyhow!(
            "invalid {key} setting: {v}"
          )
        })
      })
      .transpose()
  }

  pub fn storage_key(&self) -> String {
    self
      .get("storage.key")
      .map(|key| key.trim().to_string())
      .filter(|key| !key.is_empty())
      .unwrap_or_else(|| {
        DEFAULT_STORAGE_KEY.to_string()
      })
  }

  pub fn default_category(
    &self
  ) -> anyhow::Result<Category> {
    match self.get("default.category") {
      | Some(raw) => raw
        .parse::<Category>()
        .context(
          "invalid default.category \
           setting"
        ),
      | None => Ok(Category::default())
    }
  }

  pub fn display_zone(
    &self
  ) -> anyhow::Result<DisplayZone> {
    DisplayZone::resolve(
      self
        .get("display.timezone")
        .as_deref()
    )
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      if key.is_empty() {
        return Err(anyhow!(
          "empty key on config line \
           {}:{}",
          path.display(),
          line_num + 1
        ));
      }
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  if let Some(path) = override_dir {
    return Ok(path.to_path_buf());
  }

  if let Some(cfg_value) =
    cfg.get("data.location")
    && !cfg_value.trim().is_empty()
  {
    return Ok(expand_tilde(Path::new(
      cfg_value.trim()
    )));
  }

  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".tasklist"))
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if env_path == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      env_path
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping config \
       lookup"
    );
    return Ok(None);
  };
  let candidate =
    home.join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;
  use std::path::Path;

  use tempfile::tempdir;

  use super::{
    Config,
    resolve_data_dir
  };
  use crate::task::Category;

  #[test]
  fn file_values_override_defaults() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("todorc");
    fs::write(
      &rc,
      "# personal setup\n\
       storage.key = chores\n\
       \n\
       default.category = work  # most \
       tasks are work\n\
       color=off\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(rc.as_path()))
      .expect("load config");
    assert_eq!(cfg.storage_key(), "chores");
    assert_eq!(
      cfg
        .default_category()
        .expect("category"),
      Category::Work
    );
    assert_eq!(
      cfg
        .get_bool("color")
        .expect("color"),
      Some(false)
    );
    assert_eq!(cfg.loaded_files.len(), 1);
  }

  #[test]
  fn malformed_line_names_location() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("todorc");
    fs::write(
      &rc,
      "color = on\njust words\n"
    )
    .expect("write rc");

    let err = Config::load(Some(rc.as_path()))
      .expect_err("malformed rc");
    assert!(
      format!("{err:#}").contains(":2:")
    );
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::defaults();
    cfg.apply_overrides(vec![
      (
        "rc.default.category".to_string(),
        "health".to_string()
      ),
      (
        "storage.key".to_string(),
        "  ".to_string()
      ),
    ]);

    assert_eq!(
      cfg
        .default_category()
        .expect("category"),
      Category::Health
    );
    assert_eq!(cfg.storage_key(), "todos");
  }

  #[test]
  fn invalid_values_are_errors() {
    let mut cfg = Config::defaults();
    cfg.apply_overrides(vec![
      (
        "color".to_string(),
        "sometimes".to_string()
      ),
      (
        "default.category".to_string(),
        "errands".to_string()
      ),
      (
        "display.timezone".to_string(),
        "Nowhere/Special".to_string()
      ),
    ]);

    assert!(cfg.get_bool("color").is_err());
    assert!(
      cfg.default_category().is_err()
    );
    assert!(cfg.display_zone().is_err());
  }

  #[test]
  fn data_dir_prefers_explicit_override()
  {
    let cfg = Config::defaults();
    let dir = resolve_data_dir(
      &cfg,
      Some(Path::new("/tmp/tasks"))
    )
    .expect("resolve");
    assert_eq!(
      dir,
      Path::new("/tmp/tasks")
    );
  }
}
