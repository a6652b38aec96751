pub mod cart_items;
pub mod order_items;
pub mod orders;
pub mod product_images;
pub mod product_variants;
pub mod products;
pub mod profiles;
pub mod promotions;
pub mod users;

pub use cart_items::Entity as CartItems;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_images::Entity as ProductImages;
pub use product_variants::Entity as ProductVariants;
pub use products::Entity as Products;
pub use profiles::Entity as Profiles;
pub use promotions::Entity as Promotions;
pub use users::Entity as Users;
