pub(crate) mod forvo;
