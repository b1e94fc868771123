mod equivalence;
mod indexing;
mod queries;
mod type_annotations;
