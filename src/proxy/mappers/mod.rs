// Mappers - inbound console requests to upstream QubeTalk calls

pub mod qubetalk;
