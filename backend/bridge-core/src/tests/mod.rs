mod codec;
mod dispatcher;
mod identity;
mod queue;
mod state;
