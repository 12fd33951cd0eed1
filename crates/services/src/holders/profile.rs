//! The signed-in user's profile document and photo.

use std::sync::Arc;

use bytes::Bytes;
use domains::{collections, encode, image_key, DocumentStore, FieldMap, ObjectStore, UserProfile};
use serde_json::json;

use crate::context::Backend;
use crate::holder::HolderState;
use crate::holders::session::Session;

/// Single-document holder: reads and writes `users/{uid}` directly instead
/// of keeping a collection cache.
#[derive(Clone)]
pub struct ProfileHolder {
    documents: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    session: Session,
    state: HolderState<Option<UserProfile>>,
}

impl ProfileHolder {
    pub fn new(backend: &Backend, session: Session) -> Self {
        Self {
            documents: Arc::clone(&backend.documents),
            objects: Arc::clone(&backend.objects),
            session,
            state: HolderState::default(),
        }
    }

    pub fn state(&self) -> &HolderState<Option<UserProfile>> {
        &self.state
    }

    pub async fn load_profile(&self) -> Option<UserProfile> {
        let profile = self
            .state
            .track("load_profile", async {
                let user_id = self.session.require_user()?;
                self.documents
                    .get(collections::USERS, &user_id)
                    .await?
                    .decode::<UserProfile>()
            })
            .await?;
        self.state.data.set(Some(profile.clone()));
        Some(profile)
    }

    /// Replaces name, surname and location, keeping the current photo.
    pub async fn save_profile(&self, name: &str, surname: &str, location: &str) -> Option<UserProfile> {
        let profile = self
            .state
            .track("save_profile", async {
                let user_id = self.session.require_user()?;
                let profile = UserProfile {
                    id: user_id.clone(),
                    name: name.trim().to_string(),
                    surname: surname.trim().to_string(),
                    location: location.trim().to_string(),
                    image_url: self
                        .state
                        .data
                        .with(|p| p.as_ref().and_then(|p| p.image_url.clone())),
                };
                self.documents
                    .set(collections::USERS, &user_id, encode(&profile)?)
                    .await?;
                Ok(profile)
            })
            .await?;
        self.state.data.set(Some(profile.clone()));
        Some(profile)
    }

    /// Uploads a profile photo to `users/{uid}.webp` and records its URL.
    pub async fn upload_photo(&self, image: Bytes) -> Option<String> {
        let url = self
            .state
            .track("upload_photo", async {
                let user_id = self.session.require_user()?;
                let key = image_key(collections::USERS, &user_id);
                self.objects.put(&key, image, &mime::IMAGE_STAR).await?;
                let url = self.objects.download_url(&key).await?;

                let mut fields = FieldMap::new();
                fields.insert("image_url".into(), json!(url));
                self.documents.update(collections::USERS, &user_id, fields).await?;
                Ok(url)
            })
            .await?;

        self.state.data.update(|p| {
            if let Some(p) = p {
                p.image_url = Some(url.clone());
            }
        });
        Some(url)
    }
}
