use ghcore_search::LinkCategory;

/// Lists the reference categories and the entity types each may produce.
#[derive(Debug, Clone, Copy)]
pub struct CategoriesStrategy;

impl super::CommandStrategy for CategoriesStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        for category in LinkCategory::ALL {
            let candidates: Vec<&str> = category
                .candidates()
                .iter()
                .map(|node_type| node_type.as_str())
                .collect();
            println!("{:<32}{}", category.as_str(), candidates.join(", "));
        }
        Ok(())
    }
}
