//! Dashboard state for Skyboard
//!
//! Location resolution with debounce and stale-response protection, the
//! current and daily weather views, saved-reading history, exports and the
//! status indicators that go with them.

pub mod current;
pub mod dashboard;
pub mod export;
pub mod forecast;
pub mod history;
pub mod map;
pub mod resolver;
pub mod sequence;
pub mod status;
pub mod username;
pub mod view;

pub use current::CurrentWeatherView;
pub use dashboard::Dashboard;
pub use export::Exporter;
pub use forecast::{forecast_window, normalize, DailyForecastView};
pub use history::{UserHistory, UNKNOWN_LOCATION};
pub use map::map_embed_url;
pub use resolver::{Commit, Geocoder, LocationResolver, ResolutionState, ResolvedLocation};
pub use sequence::{RequestSequence, Ticket};
pub use status::{ActionStatus, StatusTracker};
pub use username::{generate_token, UserIdentity};
pub use view::ViewState;
