mod attributes;
mod implicit_members;
