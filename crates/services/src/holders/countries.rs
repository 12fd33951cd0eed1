//! Country catalogue: list, detail, search and image upload.

use std::sync::Arc;

use bytes::Bytes;
use domains::{collections, image_key, Country, FieldMap, ObjectStore, Query};

use crate::context::Backend;
use crate::holder::HolderState;
use crate::observable::Observable;
use crate::pipeline::country_search;
use crate::remote_store::{FetchOutcome, RemoteStore};

#[derive(Clone)]
pub struct CountryHolder {
    store: RemoteStore<Country>,
    objects: Arc<dyn ObjectStore>,
    state: HolderState<Vec<Country>>,
    /// Country shown on the detail screen.
    selected: Observable<Option<Country>>,
}

impl CountryHolder {
    pub fn new(backend: &Backend) -> Self {
        let store = RemoteStore::with_coordinator(
            Arc::clone(&backend.documents),
            collections::COUNTRIES,
            backend.coordinator.clone(),
        );
        let state = HolderState::with_data(store.cache().as_observable().clone());
        Self {
            store,
            objects: Arc::clone(&backend.objects),
            state,
            selected: Observable::new(None),
        }
    }

    pub fn state(&self) -> &HolderState<Vec<Country>> {
        &self.state
    }

    pub fn selected(&self) -> &Observable<Option<Country>> {
        &self.selected
    }

    pub async fn load_countries(&self) -> Option<FetchOutcome> {
        self.state
            .track("load_countries", self.store.fetch_all(Query::all()))
            .await
    }

    /// Loads one country for the detail screen.
    pub async fn load_country(&self, id: &str) -> Option<Country> {
        let country = self.state.track("load_country", self.store.get(id)).await?;
        self.selected.set(Some(country.clone()));
        Some(country)
    }

    /// Countries whose name in `lang` contains `text`, alphabetically.
    pub fn search(&self, text: &str, lang: &str) -> Vec<Country> {
        self.store
            .cache()
            .with(|countries| country_search(text, lang).apply(countries))
    }

    pub fn find_by_name(&self, name: &str) -> Option<Country> {
        self.store.cache().with(|countries| {
            countries
                .iter()
                .find(|c| c.canonical_name().eq_ignore_ascii_case(name))
                .cloned()
        })
    }

    pub async fn add_country(&self, country: Country) -> Option<Country> {
        self.state.track("add_country", self.store.create(&country)).await
    }

    pub async fn update_country_fields(&self, id: &str, fields: FieldMap) -> bool {
        self.state
            .track("update_country", self.store.update(id, fields))
            .await
            .is_some()
    }

    pub async fn delete_country(&self, id: &str) -> bool {
        let deleted = self
            .state
            .track("delete_country", self.store.delete(id))
            .await
            .is_some();
        if deleted && self.selected.with(|c| c.as_ref().is_some_and(|c| c.id == id)) {
            self.selected.set(None);
        }
        deleted
    }

    /// Uploads a cover image to `countries/{name}.webp` and stores its
    /// download URL on the country.
    pub async fn upload_country_image(&self, country: &Country, image: Bytes) -> Option<String> {
        let key = image_key(collections::COUNTRIES, country.canonical_name());
        let url = self
            .state
            .track("upload_country_image", async {
                self.objects.put(&key, image, &mime::IMAGE_STAR).await?;
                let url = self.objects.download_url(&key).await?;
                let mut fields = FieldMap::new();
                fields.insert("image_url".into(), url.clone().into());
                self.store.update(&country.id, fields).await?;
                Ok(url)
            })
            .await?;

        if self.selected.with(|c| c.as_ref().is_some_and(|c| c.id == country.id)) {
            self.selected.update(|c| {
                if let Some(c) = c {
                    c.image_url = Some(url.clone());
                }
            });
        }
        Some(url)
    }
}
