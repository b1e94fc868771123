mod files;
mod round_trip;
mod versions;
