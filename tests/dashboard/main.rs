mod projection;
mod resolver;
mod support;
