// ABOUTME: Strongly-typed states and wire codes reported by the modem
// ABOUTME: Session lifecycle, SIM lock, bearer status and HTTP method codes

mod bearer_state;
mod modem_state;
mod pin_state;

pub use bearer_state::{BearerState, HttpMethod};
pub use modem_state::ModemState;
pub use pin_state::PinState;
