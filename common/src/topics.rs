pub const TOPIC_SENSOR_TEMP: &str = "pool/sensor/temperature";
pub const TOPIC_SENSOR_STATUS: &str = "pool/sensor/status";

pub const TOPIC_CONTROLLER_STATE: &str = "pool/controller/state";

pub const TOPIC_CMD_MANUAL: &str = "pool/cmnd/manual";
