//! Profile stores: the local user and the friend list.
//!
//! Profile edits go through [`ProfileEdit`], which owns an image staging
//! session. Nothing reaches disk until `save`; dropping the edit discards it.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncRead;

use crate::assets::{AssetStager, EditSession, ImageRef};
use crate::error::{Error, Result};
use crate::model::{ME_ID, Profile};
use crate::store::codec::{JsonListCodec, ProfilePrefsCodec};
use crate::store::persistent::{Snapshot, Store};

/// Status message given to a newly added friend.
pub const DEFAULT_FRIEND_STATUS: &str = "Looking forward to honest feedback!";

/// Name shown for an id that matches no profile.
pub const UNKNOWN_NAME: &str = "Unknown user";

pub struct ProfileStore {
    me: Arc<Store<Profile>>,
    friends: Arc<Store<Vec<Profile>>>,
    stager: AssetStager,
}

impl ProfileStore {
    pub async fn open(
        prefs_path: impl Into<PathBuf>,
        friends_path: impl Into<PathBuf>,
        stager: AssetStager,
    ) -> Self {
        let me = Store::open(
            "profile",
            prefs_path,
            ProfilePrefsCodec::new(stager.clone()),
        )
        .await;

        let validator = stager.clone();
        let friends_codec = JsonListCodec::new().with_fixup(move |mut friend: Profile| {
            friend.image_ref = friend.image_ref.take().and_then(|r| validator.validate(&r, &friend.id));
            friend
        });
        let friends = Store::open("friends", friends_path, friends_codec).await;

        Self {
            me: Arc::new(me),
            friends: Arc::new(friends),
            stager,
        }
    }

    pub fn me(&self) -> Snapshot<Profile> {
        self.me.snapshot()
    }

    pub fn me_store(&self) -> &Arc<Store<Profile>> {
        &self.me
    }

    pub fn friends(&self) -> Snapshot<Vec<Profile>> {
        self.friends.snapshot()
    }

    pub fn friends_store(&self) -> &Arc<Store<Vec<Profile>>> {
        &self.friends
    }

    pub fn stager(&self) -> &AssetStager {
        &self.stager
    }

    pub fn friend(&self, id: &str) -> Option<Profile> {
        self.friends.snapshot().iter().find(|f| f.id == id).cloned()
    }

    /// Look up any profile. Unknown ids get a placeholder profile.
    pub fn profile(&self, id: &str) -> Profile {
        if id == ME_ID {
            return (*self.me()).clone();
        }
        self.friend(id).unwrap_or_else(|| Profile::new(id, UNKNOWN_NAME))
    }

    /// Register a friend keyed by their phone number with dashes removed.
    pub async fn add_friend(&self, name: &str, phone: &str) -> Result<Profile> {
        let friend = Profile::new(phone.replace('-', ""), name).with_status_message(DEFAULT_FRIEND_STATUS);
        let added = friend.clone();

        self.friends
            .mutate(move |friends| {
                if friends.iter().any(|f| f.id == friend.id) {
                    return Err(Error::DuplicateFriend { name: friend.name });
                }
                let mut next = friends.clone();
                next.push(friend);
                Ok(next)
            })
            .await?;

        log::info!("Added friend {} ({})", added.name, added.id);
        Ok(added)
    }

    pub async fn update_me(&self, mut profile: Profile) -> Result<()> {
        profile.id = ME_ID.to_string();
        self.me.mutate(move |_| Ok(profile)).await?;
        Ok(())
    }

    pub async fn update_friend(&self, profile: Profile) -> Result<()> {
        self.friends
            .mutate(move |friends| {
                let Some(index) = friends.iter().position(|f| f.id == profile.id) else {
                    return Err(Error::ProfileNotFound { id: profile.id });
                };
                let mut next = friends.clone();
                next[index] = profile;
                Ok(next)
            })
            .await?;
        Ok(())
    }

    /// Start editing the profile `id` ("me" or a friend).
    pub fn begin_edit(&self, id: &str) -> Result<ProfileEdit<'_>> {
        let draft = if id == ME_ID {
            (*self.me()).clone()
        } else {
            self.friend(id).ok_or_else(|| Error::ProfileNotFound { id: id.to_string() })?
        };

        Ok(ProfileEdit {
            store: self,
            original_image: draft.image_ref.clone(),
            draft,
            session: self.stager.begin(),
        })
    }

    pub async fn refresh(&self) {
        self.me.refresh().await;
        self.friends.refresh().await;
    }
}

/// An in-progress profile edit.
pub struct ProfileEdit<'a> {
    store: &'a ProfileStore,
    draft: Profile,
    original_image: Option<ImageRef>,
    session: EditSession,
}

impl ProfileEdit<'_> {
    pub fn draft(&self) -> &Profile {
        &self.draft
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.draft.name = name.into();
        self
    }

    pub fn set_status_message(&mut self, status: impl Into<String>) -> &mut Self {
        self.draft.status_message = status.into();
        self
    }

    pub fn set_arrival_time(&mut self, time: impl Into<String>) -> &mut Self {
        self.draft.arrival_time = time.into();
        self
    }

    pub fn set_arrival_time_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.draft.arrival_time_label = label.into();
        self
    }

    /// Copy a new image into the session's temp file.
    ///
    /// The draft points at the temp file until `save`.
    pub async fn stage_image<R>(&mut self, source: &mut R) -> Result<ImageRef>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let temp = self.session.stage(source).await?;
        self.draft.image_ref = Some(temp.clone());
        Ok(temp)
    }

    /// Promote any staged image and persist the draft.
    pub async fn save(self) -> Result<Profile> {
        let ProfileEdit {
            store,
            mut draft,
            original_image,
            session,
        } = self;

        draft.image_ref = session.commit(&draft.id, original_image).await?;

        if draft.is_me() {
            store.update_me(draft.clone()).await?;
        } else {
            store.update_friend(draft.clone()).await?;
        }
        Ok(draft)
    }

    /// Discard the edit and any staged image.
    pub fn cancel(self) {
        self.session.rollback();
    }
}
