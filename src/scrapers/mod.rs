//! Reading the top headline off a JavaScript-rendered news stream.
//!
//! The work is split in three:
//!
//! | Module | Role |
//! |--------|------|
//! | [`render`] | The [`render::PageRenderer`] seam plus pure HTML extraction |
//! | [`chrome`] | Headless Chrome implementation over the DevTools protocol |
//! | [`tradingeconomics`] | Stream URL, selector and the `fetch_top_item` contract |
//!
//! The stream page builds its list client side, so a plain HTTP GET returns
//! an empty shell. Rendering happens in a real browser; once the selector is
//! present, the serialized DOM is parsed with `scraper` exactly like a static
//! page would be.

pub mod chrome;
pub mod render;
pub mod tradingeconomics;
