mod consistency;
mod pagination;
mod persistence;
