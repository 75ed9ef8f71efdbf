//! File codecs for the stores.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::assets::{self, AssetStager};
use crate::error::Result;
use crate::model::{ME_ID, Profile};
use crate::store::persistent::Codec;

type Fixup<T> = Arc<dyn Fn(T) -> T + Send + Sync>;

/// A JSON array of records.
///
/// An optional fixup runs on every record read back from disk.
pub struct JsonListCodec<T> {
    seed: Vec<T>,
    fixup: Option<Fixup<T>>,
}

impl<T> JsonListCodec<T> {
    /// No seed: a missing file loads as an empty list.
    pub fn new() -> Self {
        Self::seeded(Vec::new())
    }

    pub fn seeded(seed: Vec<T>) -> Self {
        Self { seed, fixup: None }
    }

    pub fn with_fixup(mut self, fixup: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        self.fixup = Some(Arc::new(fixup));
        self
    }
}

impl<T> Default for JsonListCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec<Vec<T>> for JsonListCodec<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn seed(&self) -> Vec<T> {
        self.seed.clone()
    }

    fn empty(&self) -> Vec<T> {
        Vec::new()
    }

    fn decode(&self, text: &str) -> Result<Vec<T>> {
        let items: Vec<T> = serde_json::from_str(text)?;
        Ok(match &self.fixup {
            Some(fixup) => items.into_iter().map(|item| fixup(item)).collect(),
            None => items,
        })
    }

    fn encode(&self, value: &Vec<T>) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)?)
    }
}

pub const KEY_NAME: &str = "profile_name";
pub const KEY_ARRIVAL_LABEL: &str = "profile_arrival_time_label";
pub const KEY_ARRIVAL_TIME: &str = "profile_arrival_time";
pub const KEY_STATUS_MESSAGE: &str = "profile_status_message";
pub const KEY_IMAGE: &str = "profile_image_uri";

pub const DEFAULT_ME_NAME: &str = "My name";
pub const DEFAULT_ME_STATUS: &str = "Keep it up today!";

/// The local user's profile as a flat key/value file.
///
/// Missing keys take defaults. The stored image path is kept only if the
/// file it names still exists.
pub struct ProfilePrefsCodec {
    stager: AssetStager,
}

impl ProfilePrefsCodec {
    pub fn new(stager: AssetStager) -> Self {
        Self { stager }
    }

    pub fn default_profile() -> Profile {
        Profile::new(ME_ID, DEFAULT_ME_NAME).with_status_message(DEFAULT_ME_STATUS)
    }
}

impl Codec<Profile> for ProfilePrefsCodec {
    fn seed(&self) -> Profile {
        Self::default_profile()
    }

    fn empty(&self) -> Profile {
        Self::default_profile()
    }

    fn decode(&self, text: &str) -> Result<Profile> {
        let mut prefs: BTreeMap<String, String> = serde_json::from_str(text)?;
        let mut profile = Self::default_profile();

        if let Some(name) = prefs.remove(KEY_NAME) {
            profile.name = name;
        }
        if let Some(label) = prefs.remove(KEY_ARRIVAL_LABEL) {
            profile.arrival_time_label = label;
        }
        if let Some(time) = prefs.remove(KEY_ARRIVAL_TIME) {
            profile.arrival_time = time;
        }
        if let Some(status) = prefs.remove(KEY_STATUS_MESSAGE) {
            profile.status_message = status;
        }
        profile.image_ref = prefs
            .remove(KEY_IMAGE)
            .and_then(|stored| assets::validate(&stored, &self.stager.permanent_path(ME_ID)));

        Ok(profile)
    }

    fn encode(&self, value: &Profile) -> Result<String> {
        let mut prefs = BTreeMap::new();
        prefs.insert(KEY_NAME, value.name.clone());
        prefs.insert(KEY_ARRIVAL_LABEL, value.arrival_time_label.clone());
        prefs.insert(KEY_ARRIVAL_TIME, value.arrival_time.clone());
        prefs.insert(KEY_STATUS_MESSAGE, value.status_message.clone());
        if let Some(image) = &value.image_ref {
            prefs.insert(KEY_IMAGE, image.as_str().to_string());
        }
        Ok(serde_json::to_string_pretty(&prefs)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ImageRef;
    use tempfile::TempDir;

    #[test]
    fn test_list_fixup_runs_on_decode_only() {
        let codec = JsonListCodec::seeded(vec![0u32]).with_fixup(|n| n + 100);
        assert_eq!(codec.seed(), vec![0]);
        assert_eq!(codec.decode("[1, 2]").unwrap(), vec![101, 102]);
        assert!(codec.decode("{}").is_err());
    }

    #[test]
    fn test_prefs_missing_keys_take_defaults() {
        let temp = TempDir::new().unwrap();
        let codec = ProfilePrefsCodec::new(AssetStager::new(temp.path()));

        let profile = codec.decode(r#"{"profile_name": "Dana"}"#).unwrap();
        assert_eq!(profile.id, ME_ID);
        assert_eq!(profile.name, "Dana");
        assert_eq!(profile.arrival_time, "20 : 00");
        assert_eq!(profile.status_message, DEFAULT_ME_STATUS);
        assert!(profile.image_ref.is_none());
    }

    #[test]
    fn test_prefs_roundtrip_keeps_existing_image() {
        let temp = TempDir::new().unwrap();
        let stager = AssetStager::new(temp.path());
        let image = stager.permanent_path(ME_ID);
        std::fs::write(&image, b"jpeg").unwrap();

        let codec = ProfilePrefsCodec::new(stager);
        let mut profile = ProfilePrefsCodec::default_profile();
        profile.name = "Dana".to_string();
        profile.image_ref = Some(ImageRef::from_path(&image));

        let text = codec.encode(&profile).unwrap();
        assert!(text.contains(KEY_IMAGE));
        assert_eq!(codec.decode(&text).unwrap(), profile);
    }

    #[test]
    fn test_prefs_drops_dangling_image() {
        let temp = TempDir::new().unwrap();
        let codec = ProfilePrefsCodec::new(AssetStager::new(temp.path()));
        let gone = temp.path().join("gone.jpg");
        let text = format!(r#"{{"profile_image_uri": "file://{}"}}"#, gone.display());

        assert!(codec.decode(&text).unwrap().image_ref.is_none());
    }
}
