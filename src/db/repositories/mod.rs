mod authorizations;
mod quantity_samples;
