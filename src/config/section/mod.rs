//! Configuration section definitions.
//!
//! Each module corresponds to a section in `osmfc.toml`:
//!
//! | Module   | TOML Section | Purpose                                   |
//! |----------|--------------|-------------------------------------------|
//! | `osm`    | `[osm]`      | Endpoints, timeout, user agent            |
//! | `filter` | `[filter]`   | Required tags of selected features        |
//! | `deck`   | `[deck]`     | Deck name, note model, media directory    |
//! | `map`    | `[map]`      | Canvas size, highlight colour, layers     |

mod deck;
mod filter;
mod map;
mod osm;

pub use deck::DeckConfig;
pub use filter::FilterConfig;
pub use map::MapConfig;
pub use osm::OsmConfig;
