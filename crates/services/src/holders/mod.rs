//! State holders: one per screen family, each exposing `data`,
//! `is_loading` and `error_message`.

pub mod countries;
pub mod likes;
pub mod profile;
pub mod reviews;
pub mod session;
pub mod trips;
pub mod weather;

pub use countries::CountryHolder;
pub use likes::LikeHolder;
pub use profile::ProfileHolder;
pub use reviews::ReviewHolder;
pub use session::{Registration, Session, SessionHolder};
pub use trips::TripHolder;
pub use weather::WeatherHolder;

use std::sync::Arc;

use crate::context::Backend;
use crate::holder::Scoped;

/// Every holder the application needs, sharing one session.
#[derive(Clone)]
pub struct Holders {
    pub session: Scoped<SessionHolder>,
    pub countries: Scoped<CountryHolder>,
    pub reviews: Scoped<ReviewHolder>,
    pub trips: Scoped<TripHolder>,
    pub likes: Scoped<LikeHolder>,
    pub profile: Scoped<ProfileHolder>,
    pub weather: Scoped<WeatherHolder>,
}

impl Holders {
    pub fn new(backend: &Backend) -> Self {
        let session = Session::new(Arc::clone(&backend.auth));
        Self {
            session: Scoped::new(SessionHolder::new(
                session.clone(),
                Arc::clone(&backend.auth),
                Arc::clone(&backend.documents),
            )),
            countries: Scoped::new(CountryHolder::new(backend)),
            reviews: Scoped::new(ReviewHolder::new(backend, session.clone())),
            trips: Scoped::new(TripHolder::new(backend, session.clone())),
            likes: Scoped::new(LikeHolder::new(backend, session.clone())),
            profile: Scoped::new(ProfileHolder::new(backend, session)),
            weather: Scoped::new(WeatherHolder::new(backend)),
        }
    }
}
