mod helpers;
mod lifecycle;
mod messaging;
mod reconnect;
