//! Core runtime components: the sensor reader, the latest-reading store,
//! the acquisition loop, and the publish fan-out.

pub mod fanout;
pub mod poller;
pub mod reading;
pub mod sensor;
pub mod state;

pub use fanout::{DeviceIdentity, MqttFanout};
pub use poller::{PollLoop, ReadingSink};
pub use reading::Reading;
pub use sensor::{Ee895, RegisterBus, SensorError};
pub use state::StateStore;
