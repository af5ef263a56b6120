use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{Data, DeriveInput, Fields, GenericArgument, Ident, LitStr, PathArguments, Result, Type};

/// A struct deriving `Model`.
pub struct Model {
    pub ident: Ident,
    pub name: String,
    pub table: Option<LitStr>,
    pub fields: Vec<Field>,
}

pub struct Field {
    pub ident: Ident,
    pub name: String,
    pub column: Option<LitStr>,
    pub table: Option<LitStr>,
    pub skip: bool,
    pub kind: Kind,
}

pub enum Kind {
    Scalar,
    Optional,
    Entity { inner: Type, boxed: bool, optional: bool },
    Collection { inner: Type, boxed: bool },
}

impl Field {
    /// Reads from and writes to a column.
    pub const fn is_mapped(&self) -> bool {
        !self.skip && matches!(self.kind, Kind::Scalar | Kind::Optional)
    }
}

impl TryFrom<&DeriveInput> for Model {
    type Error = syn::Error;

    fn try_from(input: &DeriveInput) -> Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &input.generics,
                "`Model` can't be derived for generic types",
            ));
        }
        let Data::Struct(data) = &input.data else {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "`Model` can only be derived for structs",
            ));
        };
        let Fields::Named(named) = &data.fields else {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "`Model` can only be derived for structs with named fields",
            ));
        };

        let mut attrs = Attributes::default();
        for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("databam")) {
            attr.parse_nested_meta(|meta| attrs.parse_struct(&meta))?;
        }

        let fields = named.named.iter().map(Field::try_from).collect::<Result<Vec<_>>>()?;

        Ok(Self {
            ident: input.ident.clone(),
            name: input.ident.unraw().to_string(),
            table: attrs.table,
            fields,
        })
    }
}

impl TryFrom<&syn::Field> for Field {
    type Error = syn::Error;

    fn try_from(field: &syn::Field) -> Result<Self> {
        let Some(ident) = &field.ident else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };

        let mut attrs = Attributes::default();
        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("databam")) {
            attr.parse_nested_meta(|meta| attrs.parse_field(&meta))?;
        }

        let kind = if attrs.relation {
            relation(&field.ty)?
        } else if wrapped(&field.ty, "Option").is_some() {
            Kind::Optional
        } else {
            Kind::Scalar
        };

        Ok(Self {
            ident: ident.clone(),
            name: ident.unraw().to_string(),
            column: attrs.column,
            table: attrs.table,
            skip: attrs.skip,
            kind,
        })
    }
}

fn relation(ty: &Type) -> Result<Kind> {
    if let Some(inner) = wrapped(ty, "Option") {
        let (inner, boxed) = unbox(inner);
        return Ok(Kind::Entity {
            inner,
            boxed,
            optional: true,
        });
    }
    if let Some(inner) = wrapped(ty, "Vec") {
        let (inner, boxed) = unbox(inner);
        return Ok(Kind::Collection { inner, boxed });
    }
    if matches!(ty, Type::Path(path) if path.qself.is_none()) {
        let (inner, boxed) = unbox(ty);
        return Ok(Kind::Entity {
            inner,
            boxed,
            optional: false,
        });
    }

    Err(syn::Error::new_spanned(
        ty,
        "relation fields must be a model type, optionally wrapped in `Box`, `Option` or `Vec`",
    ))
}

fn unbox(ty: &Type) -> (Type, bool) {
    wrapped(ty, "Box").map_or_else(|| (ty.clone(), false), |inner| (inner.clone(), true))
}

// The single type argument of `wrapper<T>`, matched on the last path segment.
fn wrapped<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }

    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }

    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

#[derive(Default)]
struct Attributes {
    table: Option<LitStr>,
    column: Option<LitStr>,
    skip: bool,
    relation: bool,
}

// See https://docs.rs/syn/latest/syn/meta/fn.parser.html
impl Attributes {
    fn parse_struct(&mut self, meta: &ParseNestedMeta) -> Result<()> {
        if meta.path.is_ident("table") {
            self.table = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error("unsupported property"));
        }

        Ok(())
    }

    fn parse_field(&mut self, meta: &ParseNestedMeta) -> Result<()> {
        if meta.path.is_ident("table") {
            self.table = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("column") {
            self.column = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("skip") {
            self.skip = true;
        } else if meta.path.is_ident("relation") {
            self.relation = true;
        } else {
            return Err(meta.error("unsupported property"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use quote::ToTokens;
    use syn::parse_quote;

    use super::*;

    fn parse(input: &DeriveInput) -> Result<Model> {
        Model::try_from(input)
    }

    fn error(input: &DeriveInput) -> String {
        match parse(input) {
            Ok(model) => panic!("expected an error deriving `{}`", model.name),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn attributes() {
        let input: DeriveInput = parse_quote! {
            #[derive(Default)]
            #[databam(table = "memberships")]
            pub struct Membership {
                pub id: String,
                #[databam(column = "type")]
                pub kind: String,
                #[databam(skip)]
                pub cached: bool,
                pub note: Option<String>,
            }
        };

        let model = parse(&input).unwrap();
        assert_eq!(model.name, "Membership");
        assert_eq!(model.table.unwrap().value(), "memberships");
        assert_eq!(model.fields.len(), 4);

        let kind = &model.fields[1];
        assert_eq!(kind.column.as_ref().unwrap().value(), "type");
        assert!(kind.is_mapped());

        assert!(model.fields[2].skip);
        assert!(!model.fields[2].is_mapped());
        assert!(matches!(model.fields[3].kind, Kind::Optional));
    }

    #[test]
    fn relations() {
        let input: DeriveInput = parse_quote! {
            struct Tenant {
                #[databam(relation)]
                creator: Option<Box<Person>>,
                #[databam(relation)]
                owner: Option<Person>,
                #[databam(relation)]
                members: Vec<Membership>,
                #[databam(relation)]
                guests: Vec<Box<Person>>,
                #[databam(relation)]
                admin: Person,
                #[databam(relation)]
                billing: Box<Person>,
            }
        };

        let model = parse(&input).unwrap();
        let kinds: Vec<_> = model
            .fields
            .iter()
            .map(|field| match &field.kind {
                Kind::Entity { inner, boxed, optional: true } => {
                    ("entity", inner.to_token_stream().to_string(), *boxed)
                }
                Kind::Entity { inner, boxed, optional: false } => {
                    ("embedded", inner.to_token_stream().to_string(), *boxed)
                }
                Kind::Collection { inner, boxed } => {
                    ("collection", inner.to_token_stream().to_string(), *boxed)
                }
                Kind::Scalar | Kind::Optional => ("column", String::new(), false),
            })
            .collect();

        assert_eq!(
            kinds,
            [
                ("entity", "Person".to_owned(), true),
                ("entity", "Person".to_owned(), false),
                ("collection", "Membership".to_owned(), false),
                ("collection", "Person".to_owned(), true),
                ("embedded", "Person".to_owned(), false),
                ("embedded", "Person".to_owned(), true),
            ]
        );
        assert!(model.fields.iter().all(|field| !field.is_mapped()));
    }

    #[test]
    fn raw_identifiers() {
        let input: DeriveInput = parse_quote! {
            struct r#Match {
                r#type: String,
            }
        };

        let model = parse(&input).unwrap();
        assert_eq!(model.name, "Match");
        assert_eq!(model.fields[0].name, "type");
    }

    #[test]
    fn relation_must_name_a_model() {
        let input: DeriveInput = parse_quote! {
            struct Tenant {
                #[databam(relation)]
                creators: [Person; 2],
            }
        };
        assert!(error(&input).starts_with("relation fields must be"));

        let input: DeriveInput = parse_quote! {
            struct Tenant {
                #[databam(relation)]
                creator: &'static Person,
            }
        };
        assert!(error(&input).starts_with("relation fields must be"));
    }

    #[test]
    fn unsupported_shapes() {
        let input: DeriveInput = parse_quote! {
            enum Status { Active, Inactive }
        };
        assert_eq!(error(&input), "`Model` can only be derived for structs");

        let input: DeriveInput = parse_quote! {
            struct Pair(String, String);
        };
        assert_eq!(error(&input), "`Model` can only be derived for structs with named fields");

        let input: DeriveInput = parse_quote! {
            struct Wrapper<T> { inner: T }
        };
        assert_eq!(error(&input), "`Model` can't be derived for generic types");
    }

    #[test]
    fn unknown_property() {
        let input: DeriveInput = parse_quote! {
            struct Tenant {
                #[databam(primary_key)]
                id: String,
            }
        };
        assert_eq!(error(&input), "unsupported property");

        let input: DeriveInput = parse_quote! {
            #[databam(column = "id")]
            struct Tenant {
                id: String,
            }
        };
        assert_eq!(error(&input), "unsupported property");
    }
}
