pub mod alert;
pub mod button;
pub mod card;
pub mod choice;
pub mod input;
pub mod label;
pub mod markdown;
pub mod spinner;
pub mod textarea;

// Re-export component symbols so callers can `use crate::components::ui::Button` etc.
pub use alert::*;
pub use button::*;
pub use card::*;
pub use choice::*;
pub use input::*;
pub use label::*;
pub use markdown::*;
pub use spinner::*;
pub use textarea::*;
